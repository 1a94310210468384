pub mod product;
pub mod sale;

pub use product::{Entity as Product, Model as ProductModel};
pub use sale::{Entity as Sale, Model as SaleModel};
