mod client;

pub use client::{RemoteEntry, StoreClient, StoreConfig, StoreError};
