//! InMemoryCatalog - 広告データのインメモリ実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Advertisement, ItemId, StoreError};
use crate::ports::AdvertisementCatalog;

#[derive(Default)]
pub struct InMemoryCatalog {
    ads: RwLock<HashMap<ItemId, Advertisement>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `item_id`.
    pub async fn insert(&self, ad: Advertisement) {
        self.ads.write().await.insert(ad.item_id, ad);
    }

    pub async fn len(&self) -> usize {
        self.ads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ads.read().await.is_empty()
    }
}

#[async_trait]
impl AdvertisementCatalog for InMemoryCatalog {
    async fn get(&self, item_id: ItemId) -> Result<Option<Advertisement>, StoreError> {
        Ok(self.ads.read().await.get(&item_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SellerId;

    #[tokio::test]
    async fn insert_replaces_by_item_id() {
        let catalog = InMemoryCatalog::new();
        let mut ad = Advertisement {
            item_id: ItemId::new(1),
            seller_id: SellerId::new(1),
            is_verified_seller: false,
            name: "lamp".to_string(),
            description: String::new(),
            category: 1,
            images_qty: 0,
        };
        catalog.insert(ad.clone()).await;
        ad.images_qty = 4;
        catalog.insert(ad.clone()).await;

        assert_eq!(catalog.len().await, 1);
        assert_eq!(catalog.get(ItemId::new(1)).await.unwrap(), Some(ad));
        assert_eq!(catalog.get(ItemId::new(2)).await.unwrap(), None);
    }
}
