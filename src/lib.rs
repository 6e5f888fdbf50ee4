//! # Folio Media
//!
//! The media library behind a portfolio blog: a list of images owned by the
//! signed-in author, with a small editor that crops, resizes and filters an
//! image and publishes the result as a new library item.
//!
//! # Architecture: Edit → Render → Commit
//!
//! ```text
//! LibraryController ── edits ──▶ PreviewSession (geometry + filters)
//!        │
//!        ├── render ──▶ Compositor        (crop → resize → filter → JPEG)
//!        │
//!        └── commit ──▶ PersistenceGateway (object store + media table)
//! ```
//!
//! Edits never touch pixels. They update a per-preview session through a
//! pure reducer. Only `save` and `download` render, from a snapshot of the
//! session taken when they are called. `save` uploads the result as a new
//! item; the source item is never overwritten.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`library`] | The controller: listing, search, selection, preview session, save/download/delete |
//! | [`session`] | Preview session state and the reducer that applies edits |
//! | [`imaging`] | Crop geometry, filters, output sizing, and the `image`-crate compositor |
//! | [`gateway`] | Upload, register, remove and bulk remove against the storage backends |
//! | [`storage`] | Identity, object store, media table and URL fetcher traits plus local backends |
//! | [`metadata`] | Natural dimensions and file size of a previewed image |
//! | [`types`] | `MediaItem` and the normalization of raw table rows |
//! | [`naming`] | Object paths, derived `-edited.jpg` names, managed-URL detection |
//! | [`config`] | `folio-media.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Filter Expression
//!
//! The brightness/contrast/saturation settings produce a single
//! [`imaging::FilterExpression`]. Its CSS form drives a live preview; its
//! pixel form is what the compositor applies. Both come from the same
//! value, so what is previewed is what gets saved.
//!
//! ## Strict Records at the Boundary
//!
//! The media table is read as loosely typed rows and converted to
//! [`types::MediaItem`] in the gateway. Rows missing an id, a URL or a valid
//! timestamp are logged and dropped there.
//!
//! ## Local Backends
//!
//! The bundled backends keep everything on disk: a bucket directory for
//! objects and a JSON file for the table. Any other backend plugs in by
//! implementing the [`storage`] traits.

pub mod config;
pub mod gateway;
pub mod imaging;
pub mod library;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod session;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
