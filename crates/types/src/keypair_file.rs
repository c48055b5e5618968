//! Keypair files in the JSON byte-array format used by ledger tooling.

use crate::{create_program_address, Keypair, KeypairError, PdaError, Pubkey};
use std::path::Path;
use tracing::{debug, info};

/// Errors reading or writing a keypair file.
#[derive(Debug, thiserror::Error)]
pub enum KeypairFileError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File is not a JSON byte array.
    #[error("Malformed keypair file {path}: {source}")]
    Json {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Bytes do not form a keypair.
    #[error("Invalid keypair in {path}: {source}")]
    Keypair {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: KeypairError,
    },

    /// No off-curve derivation within the attempt budget.
    #[error(transparent)]
    Pda(#[from] PdaError),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> KeypairFileError + '_ {
    move |source| KeypairFileError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read a keypair from a JSON array of 64 bytes.
pub fn read_keypair_file(path: impl AsRef<Path>) -> Result<Keypair, KeypairFileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(io_err(path))?;
    let bytes: Vec<u8> = serde_json::from_str(&text).map_err(|source| KeypairFileError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Keypair::from_bytes(&bytes).map_err(|source| KeypairFileError::Keypair {
        path: path.display().to_string(),
        source,
    })
}

/// Write a keypair as a JSON array of 64 bytes, creating parent directories.
pub fn write_keypair_file(path: impl AsRef<Path>, keypair: &Keypair) -> Result<(), KeypairFileError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let json = serde_json::to_string(&keypair.to_bytes().to_vec()).map_err(|source| {
        KeypairFileError::Json {
            path: path.display().to_string(),
            source,
        }
    })?;
    std::fs::write(path, json).map_err(io_err(path))
}

/// Load the keypair at `path`, creating it first if absent.
///
/// An existing file is replaced only when `force_overwrite` is set; otherwise
/// repeated calls return the same key.
pub fn load_or_create_keypair(
    path: impl AsRef<Path>,
    force_overwrite: bool,
) -> Result<Keypair, KeypairFileError> {
    let path = path.as_ref();
    if path.exists() && !force_overwrite {
        debug!(path = %path.display(), "Loading existing keypair");
        return read_keypair_file(path);
    }
    let keypair = Keypair::generate();
    write_keypair_file(path, &keypair)?;
    info!(path = %path.display(), pubkey = %keypair.pubkey(), "Created keypair");
    Ok(keypair)
}

/// Create a persisted keypair whose key yields an off-curve address for
/// `seeds`, overwriting the file on every rejected attempt.
///
/// Returns the key's public address and the derived address.
pub fn create_keypair_file_with_pda(
    path: impl AsRef<Path>,
    seeds: &[&[u8]],
    max_attempts: u32,
) -> Result<(Pubkey, Pubkey), KeypairFileError> {
    let path = path.as_ref();
    for attempt in 1..=max_attempts {
        let keypair = load_or_create_keypair(path, attempt > 1)?;
        match create_program_address(seeds, &keypair.pubkey()) {
            Ok(derived) => return Ok((keypair.pubkey(), derived)),
            Err(PdaError::OnCurve) => {
                debug!(attempt, path = %path.display(), "Derived address on curve, regenerating key file");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(PdaError::AttemptsExhausted(max_attempts).into())
}
