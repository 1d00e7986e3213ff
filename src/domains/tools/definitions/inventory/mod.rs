pub mod products;
pub mod sales;
pub mod table;

pub use products::{GetAllProductsParams, GetAllProductsTool};
pub use sales::GetSalesDataTool;
