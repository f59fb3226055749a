pub(crate) mod byte_size;
pub(crate) mod cmd;
pub(crate) mod error;
pub(crate) mod input;
pub(crate) mod iter;
pub(crate) mod path;

