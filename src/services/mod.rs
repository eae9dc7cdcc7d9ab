pub mod campaigns;
pub mod discount;
pub mod returns;
pub mod sales;
