//! Carousel slide store (`shopi_section.carousel_data`).

use tracing::instrument;

use super::metafields::{CAROUSEL_DATA_KEY, MetafieldError, NAMESPACE};
use crate::models::CarouselData;
use crate::shopify::{MetafieldWrite, ShopAdmin, WriteCondition};

/// Load the shop's carousel data. A missing metafield loads as empty.
///
/// # Errors
///
/// Returns an error if the metafield cannot be read.
#[instrument(skip(admin), fields(shop = %admin.shop_domain()))]
pub async fn load(admin: &ShopAdmin) -> Result<CarouselData, MetafieldError> {
    let current = admin.shop_metafield(NAMESPACE, CAROUSEL_DATA_KEY).await?;
    Ok(current
        .metafield
        .map(|m| CarouselData::from_stored(&m.value))
        .unwrap_or_default())
}

/// Replace the shop's carousel data.
///
/// # Errors
///
/// Returns an error if Shopify rejects the write.
#[instrument(skip(admin, data), fields(shop = %admin.shop_domain(), slides = data.slide_count()))]
pub async fn save(admin: &ShopAdmin, data: &CarouselData) -> Result<(), MetafieldError> {
    let value = data.to_json()?;
    // The read only supplies the shop GID for ownerId
    let current = admin.shop_metafield(NAMESPACE, CAROUSEL_DATA_KEY).await?;

    admin
        .metafields_set(MetafieldWrite {
            owner_id: &current.shop_id,
            namespace: NAMESPACE,
            key: CAROUSEL_DATA_KEY,
            value,
            condition: WriteCondition::Unconditional,
        })
        .await?;

    tracing::info!("Carousel data saved");
    Ok(())
}
