//! AdvertisementCatalog port - 審査対象の広告データ

use async_trait::async_trait;

use crate::domain::{Advertisement, ItemId, StoreError};

#[async_trait]
pub trait AdvertisementCatalog: Send + Sync {
    /// `Ok(None)` when the item does not exist.
    async fn get(&self, item_id: ItemId) -> Result<Option<Advertisement>, StoreError>;
}
