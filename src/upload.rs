//! Publishing finished export files.
//!
//! The processor hands each completed, closed file to a [`Publisher`]
//! together with the remote directory it belongs in (the
//! `site/location/datalogger` tree). Publishers are built once per run and
//! passed in, so tests can use [`MirrorPublisher`] instead of a network
//! connection.

use crate::config::FtpSettings;
use crate::error::{FormatterError, Result};
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::{debug, info};

/// Destination for finished export files
pub trait Publisher {
    /// Transfer `local_file` into `remote_dir`, keeping its file name
    fn publish(&mut self, local_file: &Path, remote_dir: &Path) -> Result<()>;

    /// Release any held connection
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Uploads to an FTP server, creating remote directories as needed
pub struct FtpPublisher {
    settings: FtpSettings,
    stream: Option<FtpStream>,
    home: String,
}

impl std::fmt::Debug for FtpPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpPublisher")
            .field("address", &self.settings.address)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl FtpPublisher {
    pub fn new(settings: FtpSettings) -> Self {
        Self {
            settings,
            stream: None,
            home: String::from("/"),
        }
    }

    fn transfer_error(path: &Path, err: impl std::fmt::Display) -> FormatterError {
        FormatterError::Transfer {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    /// Connect and log in on first use
    fn connection(&mut self, local_file: &Path) -> Result<&mut FtpStream> {
        if self.stream.is_none() {
            let address = if self.settings.address.contains(':') {
                self.settings.address.clone()
            } else {
                format!("{}:21", self.settings.address)
            };
            let mut stream = FtpStream::connect(&address).map_err(|e| Self::transfer_error(local_file, e))?;

            let user = self.settings.username.as_deref().unwrap_or("anonymous");
            let password = self.settings.password.as_deref().unwrap_or("");
            stream
                .login(user, password)
                .map_err(|e| Self::transfer_error(local_file, e))?;
            stream
                .transfer_type(FileType::Binary)
                .map_err(|e| Self::transfer_error(local_file, e))?;

            if let Some(root) = &self.settings.remote_root {
                cd_tree(&mut stream, Path::new(root)).map_err(|e| Self::transfer_error(local_file, e))?;
            }
            self.home = stream.pwd().map_err(|e| Self::transfer_error(local_file, e))?;
            info!("Connected to FTP server {}", address);
            self.stream = Some(stream);
        }

        self.stream
            .as_mut()
            .ok_or_else(|| Self::transfer_error(local_file, "FTP connection unavailable"))
    }
}

/// Change into `path` one component at a time, creating missing directories
fn cd_tree(stream: &mut FtpStream, path: &Path) -> suppaftp::FtpResult<()> {
    for component in path.components() {
        let folder = match component {
            Component::RootDir => {
                stream.cwd("/")?;
                continue;
            }
            Component::Normal(folder) => folder.to_string_lossy(),
            _ => continue,
        };
        if stream.cwd(folder.as_ref()).is_err() {
            stream.mkdir(folder.as_ref())?;
            stream.cwd(folder.as_ref())?;
        }
    }
    Ok(())
}

impl Publisher for FtpPublisher {
    fn publish(&mut self, local_file: &Path, remote_dir: &Path) -> Result<()> {
        let file_name = file_name(local_file)?;
        let mut reader = File::open(local_file)?;

        let home = self.home.clone();
        let stream = self.connection(local_file)?;
        stream.cwd(&home).map_err(|e| Self::transfer_error(local_file, e))?;
        cd_tree(stream, remote_dir).map_err(|e| Self::transfer_error(local_file, e))?;
        let bytes = stream
            .put_file(&file_name, &mut reader)
            .map_err(|e| Self::transfer_error(local_file, e))?;

        debug!("Uploaded {} ({} bytes) to {}", local_file.display(), bytes, remote_dir.display());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.quit().map_err(|e| FormatterError::Transfer {
                path: PathBuf::from(&self.settings.address),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Copies files into a local directory tree
#[derive(Debug, Clone)]
pub struct MirrorPublisher {
    root: PathBuf,
}

impl MirrorPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Publisher for MirrorPublisher {
    fn publish(&mut self, local_file: &Path, remote_dir: &Path) -> Result<()> {
        let target_dir = self.root.join(remote_dir);
        fs::create_dir_all(&target_dir)?;
        let target = target_dir.join(file_name(local_file)?);
        fs::copy(local_file, &target)?;
        debug!("Mirrored {} to {}", local_file.display(), target.display());
        Ok(())
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FormatterError::Transfer {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })
}
