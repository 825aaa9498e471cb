pub mod account;
pub mod cart;
pub mod catalog;
pub mod category;
pub mod product;
pub mod similar;
pub mod slug;
