//! iconrequest - icon requests for Android icon packs
//!
//! Finds the installed apps an icon pack does not theme yet, lets the user
//! pick some, and packages them (icons, an appfilter fragment, a JSON list)
//! into a ZIP that is emailed to the pack author or uploaded to a request
//! backend.
//!
//! ## Architecture
//!
//! - `iconrequest-core`: app records, selection, configuration, callbacks
//! - `iconrequest-appfilter`: appfilter parsing and drawable validation
//! - `iconrequest-packager`: icons, manifests, message body, archive
//! - `iconrequest-delivery`: backend upload and email drafts
//!
//! This crate ties them together in [`IconRequest`].

#![warn(clippy::all)]

pub mod commands;
pub mod inventory;
pub mod orchestrator;

pub use iconrequest_appfilter as appfilter;
pub use iconrequest_core as core;
pub use iconrequest_delivery as delivery;
pub use iconrequest_packager as packager;

pub use inventory::{InventoryEntry, InventoryFile};
pub use orchestrator::{Collaborators, IconRequest, RequestPhase, SendStage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::orchestrator::{Collaborators, IconRequest, RequestPhase};
    pub use iconrequest_appfilter::{AssetDir, DrawableDir, FilterSource, ResourceResolver};
    pub use iconrequest_core::{
        App, AppSource, Callbacks, IconImage, IconSource, LoadCallback, RemoteConfig, RequestConfig, RequestError,
        SelectionListener, SendCallback,
    };
    pub use iconrequest_delivery::{EmailComposer, EmlDraftComposer, RemoteUploader, RequestUploader};
}
