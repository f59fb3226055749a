use easy_ext::ext;
use std::fmt;
use tracing::warn;

#[ext(ResultExt)]
pub(crate) impl<T, E> Result<T, E> {
    fn err_into<U>(self) -> Result<T, U>
    where
        E: Into<U>,
    {
        self.map_err(Into::into)
    }

    /// Reports the error with a warning and turns it into `None`.
    ///
    /// Meant for best-effort operations whose failure must not abort the
    /// surrounding work, e.g. notifying the requester about progress.
    fn warn_err(self, what: impl fmt::Display) -> Option<T>
    where
        E: Into<anyhow::Error>,
    {
        self.map_err(|err| {
            let err: anyhow::Error = err.into();
            warn!(err = format_args!("{err:#}"), "{what} failed");
        })
        .ok()
    }
}
