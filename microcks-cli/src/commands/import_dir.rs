//! `import-dir` scans a directory for specification files and imports
//! every one of them, reporting per-file successes and failures.

use std::path::{Path, PathBuf};

use clap::Args;
use microcks_client::ConnectOptions;
use microcks_shared::{MicrocksError, Result};
use walkdir::WalkDir;

use super::ServerArgs;

const SUPPORTED_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "xml"];

#[derive(Args, Debug)]
pub struct ImportDirArgs {
    /// Directory containing the specification files
    pub directory: PathBuf,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Scan subdirectories recursively
    #[arg(long)]
    pub recursive: bool,

    /// File pattern to match (e.g. '*.yaml', 'openapi.*')
    #[arg(long)]
    pub pattern: Option<String>,
}

pub async fn execute(args: ImportDirArgs, context: &str, options: &ConnectOptions) -> Result<()> {
    validate_directory(&args.directory)?;

    let pattern = args
        .pattern
        .as_deref()
        .map(glob::Pattern::new)
        .transpose()
        .map_err(|e| MicrocksError::Validation(format!("invalid file pattern: {e}")))?;

    let files = find_specification_files(&args.directory, args.recursive, pattern.as_ref())?;
    if files.is_empty() {
        return Err(MicrocksError::Validation(format!(
            "no specification files found in directory: {}",
            args.directory.display()
        )));
    }

    let handle = super::connect(&args.server, context, options).await?;

    let total = files.len();
    if options.verbose {
        println!("Found {total} specification files to import...");
    }

    let mut success = 0;
    for (i, file) in files.iter().enumerate() {
        match handle
            .client
            .upload_artifact(file, is_primary_artifact(file))
            .await
        {
            Ok(_) => {
                success += 1;
                if options.verbose {
                    println!("[{}/{total}] ✓ Imported: {}", i + 1, file.display());
                } else {
                    println!("✓ Imported: {}", file.display());
                }
            }
            Err(e) => println!("✗ Failed: {} - {e}", file.display()),
        }
    }

    println!();
    println!("Import completed: {success}/{total} files imported successfully");
    Ok(())
}

fn validate_directory(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MicrocksError::Validation(format!("directory does not exist: {}", path.display()))
        } else {
            MicrocksError::Io(e)
        }
    })?;
    if !metadata.is_dir() {
        return Err(MicrocksError::Validation(format!(
            "path is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

fn find_specification_files(
    dir: &Path,
    recursive: bool,
    pattern: Option<&glob::Pattern>,
) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.map_err(|e| MicrocksError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !extension
            .as_deref()
            .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e))
        {
            continue;
        }

        if let Some(pattern) = pattern {
            if !pattern.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }
        }

        files.push(entry.into_path());
    }
    Ok(files)
}

/// Postman collections are secondary artifacts; an OpenAPI or Swagger file
/// is always primary, even when its name also mentions `collection`.
fn is_primary_artifact(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.contains("openapi") || name.contains("swagger") {
        return true;
    }
    !(name.contains("postman") || name.contains("collection"))
}
