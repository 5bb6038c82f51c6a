//! Concrete source adapters for the supported upstream portals.

mod eastmoney;
mod sina;
mod tencent;

pub use eastmoney::EastMoneyAdapter;
pub use sina::SinaAdapter;
pub use tencent::TencentAdapter;
