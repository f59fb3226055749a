use crate::display;
use crate::prelude::*;
use crate::util::input;
use futures::prelude::*;

/// Returns either the files in the directory or the single file depending on
/// whether the path is a directory or a file.
pub(crate) async fn files(path: impl AsRef<Utf8Path>) -> Result<Vec<Utf8PathBuf>> {
    let path = path.as_ref();

    if !fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_owned()]);
    }

    let dir = fs::read_dir(path).await?;

    read_dir_stream(dir)
        .map(|entry| entry?.path().try_into().err_into())
        .try_collect()
        .await
}

fn read_dir_stream(dir: fs::ReadDir) -> impl futures::Stream<Item = Result<fs::DirEntry>> {
    stream::unfold(dir, |mut dir| async move {
        dir.next_entry()
            .err_into()
            .await
            .transpose()
            .map(|entry| (entry, dir))
    })
}

/// Asks for a confirmation if any of the files already exists
pub(crate) async fn validate_output_files_overwriting(
    overwrite: bool,
    paths: impl IntoIterator<Item = Utf8PathBuf>,
) -> Result {
    let existing_files: Vec<_> = paths
        .into_iter()
        .filter_map(|path| {
            path.try_exists()
                .with_context(|| format!("Failed to check if the output file exists: `{path}`"))
                .map(|exists| exists.then_some(path))
                .transpose()
        })
        .try_collect()?;

    if existing_files.is_empty() {
        return Ok(());
    }

    let files = existing_files.iter().format_with("\n", |path, f| {
        f(&format_args!("- {}", display::bold(&path)))
    });

    let message = format!("The following output files already exist.\n{files}\nOverwrite them?");

    input::read_confirmation(&message, overwrite).await?;

    Ok(())
}
