pub mod config;
pub mod controller;
pub mod error;
pub mod field;
pub mod models;
pub mod render;
pub mod store;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::controller::{ControllerOptions, Surface, ViewController};
use crate::error::Result;
use crate::render::PresentationSink;
use crate::store::{BaseUrlStore, FileStore};
use crate::transport::{Backend, HttpBackend};

/// Wire a controller from configuration: HTTP backend, file-backed base URL slot,
/// and the caller's sink and fields.
pub fn build_controller(
    cfg: &Config,
    sink: Arc<dyn PresentationSink>,
    surface: Surface,
) -> Result<ViewController> {
    let backend = Arc::new(HttpBackend::new(cfg.request_timeout())?);
    let urls = BaseUrlStore::new(
        Box::new(FileStore::new(cfg.storage.path.clone())),
        cfg.storage.key.clone(),
        &cfg.backend.default_base_url,
    );

    Ok(ViewController::new(
        backend as Arc<dyn Backend>,
        urls,
        sink,
        surface,
        ControllerOptions::from(&cfg.ui),
    ))
}
