use crate::prelude::*;

/// Asks the user to type `yes` on `stdin` unless `auto_confirm` is set.
pub(crate) async fn read_confirmation(message: &str, auto_confirm: bool) -> Result {
    if auto_confirm {
        return Ok(());
    }

    warn!("{message} Only `yes` will be accepted to confirm");

    // Tokio recommends spawning a blocking thread for user input
    // https://docs.rs/tokio/latest/tokio/io/struct.Stdin.html
    let user_input = tokio::task::spawn_blocking(move || {
        std::io::stdin()
            .lines()
            .next()
            .transpose()
            .context("Failed to read confirmation from `stdin`")?
            .context("Reached end-of-file (EOF) while reading confirmation from `stdin`")
    })
    .await
    .context("Failed to join the blocking task that reads user input")??;

    if user_input.trim() != "yes" {
        bail!("Confirmation response was not `yes`, aborting");
    }

    Ok(())
}
