//! Copyright (c) 2023 University of New Hampshire
//! SPDX-License-Identifier: MIT
//! Data model shared by every layer of the boot script server: the
//! content-addressed image registry, the per-binding boot-parameter store,
//! cloud-init payloads, and the wire-level request/response DTOs.

pub mod api;
pub mod binding;
pub mod boot_data;
pub mod cloud_init;
pub mod component;
pub mod fnv;
pub mod image;

pub use api::{BootFilterQuery, BootParams, BootParamsEntry, BootScriptQuery, Selector};
pub use boot_data::{BootData, BootDataStore};
pub use cloud_init::{CloudInit, PhoneHome};
pub use component::{ComponentRecord, RetrievalState};
pub use image::{image_key, image_type_prefix, ImageData, ImageType};
