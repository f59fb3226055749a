mod pack;
mod sticker;

use crate::prelude::*;
use async_trait::async_trait;

pub use pack::*;
pub use sticker::*;

#[async_trait]
pub(crate) trait Cmd {
    async fn run(self) -> Result;
}
