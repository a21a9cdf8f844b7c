//! Metadata extraction from produced package archives

use crate::plist;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use vpkg_errors::{Error, MetadataError, StorageError};
use vpkg_types::PackageMeta;

/// Archive member holding the package properties
pub const PROPS_ENTRY: &str = "props.plist";

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Read the metadata record stored inside a package archive
///
/// Archives may be zstd-compressed or plain tar.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, has no properties
/// entry, or the properties are malformed.
pub async fn read_package_meta(path: &Path) -> Result<PackageMeta, Error> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_package_meta_blocking(&path))
        .await
        .map_err(|e| Error::internal(format!("metadata task failed: {e}")))?
}

fn read_package_meta_blocking(path: &Path) -> Result<PackageMeta, Error> {
    let xml = read_props(path)?;
    let display = path.display().to_string();

    let value = plist::parse(&xml).map_err(|e| MetadataError::Malformed {
        path: display.clone(),
        message: e.to_string(),
    })?;

    for field in ["pkgver", "architecture"] {
        if value.get(field).and_then(|v| v.as_str()).is_none() {
            return Err(MetadataError::MissingField {
                field: field.to_string(),
            }
            .into());
        }
    }

    serde_json::from_value(value).map_err(|e| {
        MetadataError::Malformed {
            path: display,
            message: e.to_string(),
        }
        .into()
    })
}

fn read_props(path: &Path) -> Result<String, Error> {
    let mut file = File::open(path).map_err(|e| StorageError::from_io_with_path(&e, path))?;

    let mut magic = [0u8; 4];
    let compressed = match file.read_exact(&mut magic) {
        Ok(()) => magic == ZSTD_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(Error::io_with_path(&e, path)),
    };
    file.seek(SeekFrom::Start(0))
        .map_err(|e| Error::io_with_path(&e, path))?;

    let reader = BufReader::new(file);
    let found = if compressed {
        let decoder = zstd::stream::read::Decoder::with_buffer(reader)
            .map_err(|e| malformed(path, &e))?;
        find_props(decoder, path)?
    } else {
        find_props(reader, path)?
    };

    found.ok_or_else(|| {
        MetadataError::MissingProperties {
            path: path.display().to_string(),
        }
        .into()
    })
}

fn find_props<R: Read>(reader: R, path: &Path) -> Result<Option<String>, Error> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| malformed(path, &e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| malformed(path, &e))?;
        let entry_path = entry.path().map_err(|e| malformed(path, &e))?;
        if entry_path.strip_prefix(".").unwrap_or(&entry_path) != Path::new(PROPS_ENTRY) {
            continue;
        }

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| malformed(path, &e))?;
        return Ok(Some(xml));
    }
    Ok(None)
}

fn malformed(path: &Path, err: &std::io::Error) -> Error {
    MetadataError::Malformed {
        path: path.display().to_string(),
        message: err.to_string(),
    }
    .into()
}
