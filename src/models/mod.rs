pub mod fulfillment;
pub mod report;
pub mod vendor;

pub use fulfillment::{
    FulfillmentRecord, LineDetail, LineQuantity, Quantities, RawFulfillment, RawLineItem,
};
pub use report::{FillRateReport, ReportWindow};
pub use vendor::{VendorIdentityMap, VendorKey, VendorTotals};
