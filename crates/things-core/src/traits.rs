use async_trait::async_trait;

use crate::error::ThingsResult;
use crate::ids::ThingId;
use crate::thing::{Metadata, Page, Thing};

/// Persistence contract for things.
///
/// `owner` is trusted as already authorized. Every operation except
/// [`retrieve_by_key`](ThingRepository::retrieve_by_key) is scoped by owner,
/// and a thing owned by someone else is indistinguishable from a missing one.
/// Identifier arguments are taken as received from the caller; malformed
/// identifiers never reach the store.
#[async_trait]
pub trait ThingRepository: Send + Sync {
    /// Persists all things atomically and returns them unchanged.
    async fn save(&self, things: &[Thing]) -> ThingsResult<Vec<Thing>>;

    /// Updates the name and metadata of the thing matching `(owner, id)`.
    async fn update(&self, thing: &Thing) -> ThingsResult<()>;

    /// Replaces the key of the thing matching `(owner, id)`.
    async fn update_key(&self, owner: &str, id: &str, key: &str) -> ThingsResult<()>;

    /// Fetches the thing matching `(owner, id)`.
    async fn retrieve_by_id(&self, owner: &str, id: &str) -> ThingsResult<Thing>;

    /// Resolves a key to its thing identifier, regardless of owner.
    async fn retrieve_by_key(&self, key: &str) -> ThingsResult<ThingId>;

    /// Lists the owner's things ordered by id, optionally filtered by a name
    /// substring and a metadata containment document.
    async fn retrieve_all(
        &self,
        owner: &str,
        offset: u64,
        limit: u64,
        name: &str,
        metadata: &Metadata,
    ) -> ThingsResult<Page>;

    /// Lists the owner's things that are (or, with `connected == false`, are
    /// not) connected to `channel`.
    async fn retrieve_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> ThingsResult<Page>;

    /// Deletes the thing matching `(owner, id)`. Missing things are not an error.
    async fn remove(&self, owner: &str, id: &str) -> ThingsResult<()>;
}
