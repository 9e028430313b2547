//! pinpilot-core - Core library for the pinpilot CLI
//!
//! This library provides the pinner contract shared by every pinning backend,
//! the Pinata backend, and the transport, file enumeration and configuration
//! layers it is built on.

pub mod config;
pub mod error;
pub mod files;
pub mod pinata;
pub mod pinner;
pub mod transport;

// Re-export commonly used types
pub use config::{
    config_exists, get_config_path, load_config, load_config_from, mask_secret, save_config,
    save_config_to, validate_config,
};
pub use config::{AdvancedConfig, Config, ConfigFile, LoggingConfig, PinataConfig};
pub use error::{Error, ErrorKind, Result};
pub use files::{FileSource, SourceFile, WalkDirSource};
pub use pinata::{PinataApi, PinataOptions, PinataPinner, DEFAULT_BASE_URL};
pub use pinner::{assert_pinner, has_right_format, Pinner};
pub use transport::{HttpResponse, HttpTransport, MultipartUpload, PartBody, ReqwestTransport, UploadPart};
