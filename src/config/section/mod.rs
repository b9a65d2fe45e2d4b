//! Configuration section definitions.
//!
//! | Section     | Purpose                                         |
//! |-------------|-------------------------------------------------|
//! | `[cdn]`     | Origin registry, probe order, timeout, retries  |
//! | `[loader]`  | Element load deadlines                          |
//! | `[storage]` | Durable resolution state                        |
//! | `[site]`    | Where same-origin URLs are answered             |
//! | `[build]`   | Build-time config injection                     |

mod build;
pub mod cdn;
mod loader;
mod site;
mod storage;

pub use build::BuildSectionConfig;
pub use cdn::OriginConfig;
pub use loader::LoaderConfig;
pub use site::SiteSectionConfig;
pub use storage::StorageConfig;
