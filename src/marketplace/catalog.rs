//! Supplier product listings

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use super::{new_id, require_text};
use crate::models::{Product, Role, User};
use crate::store::{Collection, Store};
use crate::{OnTymError, Result};

#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
}

/// Seller details embedded in listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerContact {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl SellerContact {
    fn resolve(seller_id: &str, seller: Option<&User>) -> Self {
        Self {
            id: seller_id.to_string(),
            username: seller.map(|u| u.username.clone()),
            email: seller.map(|u| u.email.clone()),
            phone_number: seller.and_then(|u| u.phone_number.clone()),
        }
    }
}

/// A listing with its seller populated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub price: f64,
    pub quantity: u32,
    pub seller: SellerContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(OnTymError::validation("price must be a non-negative number"));
    }
    Ok(())
}

impl ProductDraft {
    fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("imageUrl", &self.image_url)?;
        require_text("category", &self.category)?;
        validate_price(self.price)
    }
}

impl ProductChanges {
    fn apply(self, product: &mut Product) -> Result<()> {
        if let Some(name) = self.name {
            require_text("name", &name)?;
            product.name = name;
        }
        if let Some(description) = self.description {
            require_text("description", &description)?;
            product.description = description;
        }
        if let Some(image_url) = self.image_url {
            require_text("imageUrl", &image_url)?;
            product.image_url = image_url;
        }
        if let Some(category) = self.category {
            require_text("category", &category)?;
            product.category = category;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
            product.price = price;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        product.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Clone)]
pub struct Catalog {
    products: Collection<Product>,
    users: Collection<User>,
}

impl Catalog {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            products: store.products.clone(),
            users: store.users.clone(),
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, seller_id: &str, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;

        let seller = self
            .users
            .get(seller_id)
            .await?
            .ok_or_else(|| OnTymError::validation("seller does not exist"))?;
        if seller.role() != Role::Supplier {
            return Err(OnTymError::forbidden("Only suppliers can list products"));
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            image_url: draft.image_url,
            category: draft.category,
            price: draft.price,
            quantity: draft.quantity,
            seller: seller.id,
            created_at: now,
            updated_at: now,
        };
        self.products.put(&product.id, &product).await?;

        info!(product_id = %product.id, "Created product");
        Ok(product)
    }

    /// All listings, newest first
    pub async fn list(&self) -> Result<Vec<Product>> {
        let mut products = self.products.list().await?;
        products.reverse();
        Ok(products)
    }

    pub async fn by_seller(&self, seller_id: &str) -> Result<Vec<Product>> {
        let mut products = self.list().await?;
        products.retain(|p| p.seller == seller_id);
        Ok(products)
    }

    /// Listings in `category` (case-insensitive); `None` lists everything
    pub async fn by_category(&self, category: Option<&str>) -> Result<Vec<Product>> {
        let mut products = self.list().await?;
        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            products.retain(|p| p.category.eq_ignore_ascii_case(category));
        }
        Ok(products)
    }

    pub async fn get(&self, product_id: &str) -> Result<Product> {
        self.products
            .get(product_id)
            .await?
            .ok_or_else(|| OnTymError::not_found("Product"))
    }

    /// Apply `changes` if `acting_seller` owns the product
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        product_id: &str,
        acting_seller: &str,
        changes: ProductChanges,
    ) -> Result<Product> {
        let existing = self.get(product_id).await?;
        if existing.seller != acting_seller {
            return Err(OnTymError::forbidden("Not authorized to update this product"));
        }

        self.products
            .update(product_id, move |product| changes.apply(product))
            .await?
            .ok_or_else(|| OnTymError::not_found("Product"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: &str, acting_seller: &str) -> Result<()> {
        let existing = self.get(product_id).await?;
        if existing.seller != acting_seller {
            return Err(OnTymError::forbidden("Not authorized to delete this product"));
        }
        self.products.remove(product_id).await?;
        info!("Deleted product");
        Ok(())
    }

    /// Populate seller details for a batch of listings
    pub async fn view(&self, products: Vec<Product>) -> Result<Vec<ProductView>> {
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            let seller = self.users.get(&product.seller).await?;
            let contact = SellerContact::resolve(&product.seller, seller.as_ref());
            views.push(ProductView {
                id: product.id,
                name: product.name,
                description: product.description,
                image_url: product.image_url,
                category: product.category,
                price: product.price,
                quantity: product.quantity,
                seller: contact,
                created_at: product.created_at,
                updated_at: product.updated_at,
            });
        }
        Ok(views)
    }

    pub async fn view_one(&self, product: Product) -> Result<ProductView> {
        let mut views = self.view(vec![product]).await?;
        views.pop().ok_or_else(|| OnTymError::not_found("Product"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{Accounts, NewAccount};
    use crate::models::{BuyerProfile, IndustrySize, Profile, SupplierProfile, SupplyScale};

    fn draft(name: &str, category: &str) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            description: "Food-safe and compostable".into(),
            image_url: "https://img.example/tray.png".into(),
            category: category.into(),
            price: 12.5,
            quantity: 100,
        }
    }

    async fn setup() -> (Catalog, User, User) {
        let store = Store::temporary().unwrap();
        let accounts = Accounts::new(&store);
        let supplier = accounts
            .register(NewAccount {
                username: "greenpack".into(),
                email: "sales@greenpack.in".into(),
                password: "supplier-pass".into(),
                phone_number: Some("12345".into()),
                profile: Profile::Supplier(SupplierProfile {
                    scale_served: SupplyScale::Medium,
                    products_offered: vec![],
                    description: None,
                    location: None,
                }),
            })
            .await
            .unwrap();
        let buyer = accounts
            .register(NewAccount {
                username: "bakery".into(),
                email: "owner@bakery.in".into(),
                password: "buyer-pass".into(),
                phone_number: None,
                profile: Profile::Buyer(BuyerProfile {
                    size_of_industry: IndustrySize::Small,
                    products_expected: vec![],
                    description: None,
                    location: "Mumbai".into(),
                }),
            })
            .await
            .unwrap();
        (Catalog::new(&store), supplier, buyer)
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let (catalog, supplier, _) = setup().await;
        catalog.create(&supplier.id, draft("Bagasse Tray", "Containers")).await.unwrap();
        catalog.create(&supplier.id, draft("Kraft Mailer", "Paper")).await.unwrap();

        let names: Vec<String> = catalog.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Kraft Mailer", "Bagasse Tray"]);

        let paper = catalog.by_category(Some("paper")).await.unwrap();
        assert_eq!(paper.len(), 1);
        assert_eq!(catalog.by_category(None).await.unwrap().len(), 2);
        assert_eq!(catalog.by_seller(&supplier.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_suppliers_list_products() {
        let (catalog, _, buyer) = setup().await;
        let result = catalog.create(&buyer.id, draft("Tray", "Containers")).await;
        assert!(matches!(result, Err(OnTymError::Forbidden { .. })));

        let unknown = catalog.create("ffffffffffffffff", draft("Tray", "Containers")).await;
        assert!(matches!(unknown, Err(OnTymError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_invalid_price_rejected() {
        let (catalog, supplier, _) = setup().await;
        let mut bad = draft("Tray", "Containers");
        bad.price = -1.0;
        assert!(matches!(
            catalog.create(&supplier.id, bad).await,
            Err(OnTymError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_owner_only_update_and_delete() {
        let (catalog, supplier, buyer) = setup().await;
        let product = catalog.create(&supplier.id, draft("Tray", "Containers")).await.unwrap();

        let changes = ProductChanges {
            price: Some(9.99),
            ..ProductChanges::default()
        };
        let denied = catalog.update(&product.id, &buyer.id, changes.clone()).await;
        assert!(matches!(denied, Err(OnTymError::Forbidden { .. })));

        let updated = catalog.update(&product.id, &supplier.id, changes).await.unwrap();
        assert!((updated.price - 9.99).abs() < f64::EPSILON);
        assert_eq!(updated.name, "Tray");

        assert!(matches!(
            catalog.delete(&product.id, &buyer.id).await,
            Err(OnTymError::Forbidden { .. })
        ));
        catalog.delete(&product.id, &supplier.id).await.unwrap();
        assert!(matches!(
            catalog.get(&product.id).await,
            Err(OnTymError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_view_populates_seller() {
        let (catalog, supplier, _) = setup().await;
        let product = catalog.create(&supplier.id, draft("Tray", "Containers")).await.unwrap();

        let view = catalog.view_one(product).await.unwrap();
        assert_eq!(view.seller.username.as_deref(), Some("greenpack"));
        assert_eq!(view.seller.email.as_deref(), Some("sales@greenpack.in"));
        assert_eq!(view.seller.phone_number.as_deref(), Some("12345"));
    }
}
