//! C2 (image registry), C3 (parameter store), and C4 (cloud-init merger):
//! the persistent core of the boot script server, all wired against the
//! [`kvstore::KvStore`] trait so the backend is swappable.

pub mod cloud_init;
pub mod error;
pub mod images;
pub mod params;

pub use cloud_init::merge_cloud_init;
pub use error::BootstoreError;
pub use images::ImageRegistry;
pub use params::ParamStore;
