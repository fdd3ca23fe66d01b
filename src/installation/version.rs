use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Archive inside the installation that carries the version metadata
pub const METADATA_ARCHIVE: &str = "webapps/ROOT/WEB-INF/lib/common-api.jar";

/// Properties resource at the root of the metadata archive
pub const VERSION_RESOURCE: &str = "serverVersion.properties.xml";

/// Key holding the human-readable version
pub const DISPLAY_VERSION_KEY: &str = "Display_Version";

/// Human-readable server version, compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerVersion(String);

impl ServerVersion {
    /// Wrap a display version string
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The raw display string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this version is exactly `expected`
    pub fn matches(&self, expected: &str) -> bool {
        self.0 == expected
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of the metadata archive for an installation directory
pub fn metadata_archive_path(install_dir: &Path) -> PathBuf {
    install_dir.join(METADATA_ARCHIVE)
}

/// `path` made absolute against the current directory, or unchanged if that fails
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Read the display version of the installation at `install_dir`.
///
/// Opens `webapps/ROOT/WEB-INF/lib/common-api.jar`, loads
/// `serverVersion.properties.xml` from it and returns the `Display_Version`
/// entry. The archive and resource handles are dropped on every return path.
///
/// # Errors
///
/// * [`Error::InstallationUnreadable`] if the archive is missing or not a regular file
/// * [`Error::MetadataMissing`] if the archive has no version resource
/// * [`Error::MetadataInvalid`] if the archive or resource cannot be decoded
#[tracing::instrument(skip_all, fields(install_dir = %install_dir.display()))]
pub fn read_version(install_dir: &Path) -> Result<ServerVersion> {
    let archive_path = metadata_archive_path(install_dir);
    if !archive_path.is_file() {
        return Err(Error::InstallationUnreadable {
            archive: absolute(&archive_path),
            install_dir: install_dir.to_path_buf(),
        });
    }

    let document = read_resource(&archive_path, install_dir, VERSION_RESOURCE)?;
    let properties = parse_properties(&document)?;
    let version = properties
        .get(DISPLAY_VERSION_KEY)
        .cloned()
        .map(ServerVersion::new)
        .ok_or_else(|| {
            Error::MetadataInvalid(format!(
                "[{}] in [{}] has no {} entry",
                VERSION_RESOURCE,
                archive_path.display(),
                DISPLAY_VERSION_KEY
            ))
        })?;

    tracing::debug!(version = %version, "Read installed server version");
    Ok(version)
}

fn read_resource(archive_path: &Path, install_dir: &Path, resource: &str) -> Result<String> {
    let file = File::open(archive_path).map_err(|_| Error::InstallationUnreadable {
        archive: absolute(archive_path),
        install_dir: install_dir.to_path_buf(),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        Error::MetadataInvalid(format!("[{}] is not a readable archive: {}", archive_path.display(), e))
    })?;

    let mut entry = match archive.by_name(resource) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(Error::MetadataMissing {
                archive: archive_path.to_path_buf(),
                resource: resource.to_string(),
            });
        }
        Err(e) => {
            return Err(Error::MetadataInvalid(format!(
                "Failed to open [{}] in [{}]: {}",
                resource,
                archive_path.display(),
                e
            )));
        }
    };

    let mut document = String::new();
    entry.read_to_string(&mut document).map_err(|e| {
        Error::MetadataInvalid(format!(
            "Failed to read [{}] in [{}]: {}",
            resource,
            archive_path.display(),
            e
        ))
    })?;
    Ok(document)
}

/// Parse a Java XML properties document into a key/value map.
///
/// Later entries with the same key replace earlier ones.
pub fn parse_properties(document: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(document);
    let mut properties = HashMap::new();
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"entry" => {
                current = Some((entry_key(&e)?, String::new()));
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"entry" => {
                properties.insert(entry_key(&e)?, String::new());
            }
            Ok(Event::Text(text)) => {
                if let Some((_, value)) = current.as_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| Error::MetadataInvalid(format!("Bad entry text: {}", e)))?;
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"entry" => {
                if let Some((key, value)) = current.take() {
                    properties.insert(key, value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::MetadataInvalid(format!(
                    "Malformed properties document at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
    }

    Ok(properties)
}

fn entry_key(element: &BytesStart<'_>) -> Result<String> {
    let attribute = element
        .try_get_attribute("key")
        .map_err(|e| Error::MetadataInvalid(format!("Bad entry attribute: {}", e)))?
        .ok_or_else(|| Error::MetadataInvalid("Properties entry without a key".to_string()))?;
    let key = attribute
        .unescape_value()
        .map_err(|e| Error::MetadataInvalid(format!("Bad entry key: {}", e)))?;
    Ok(key.into_owned())
}
