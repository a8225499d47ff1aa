// Store (inventory, warehousing, procurement)
pub mod category;
pub mod cycle_count;
pub mod goods_receipt;
pub mod goods_receipt_item;
pub mod inventory_transaction;
pub mod item;
pub mod item_supplier;
pub mod pick_list;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod put_away_task;
pub mod stock_level;
pub mod supplier;
pub mod warehouse;
pub mod warehouse_location;

// MicroFinance
pub mod fee_charge;
pub mod fee_definition;
pub mod fixed_deposit;
pub mod loan;
pub mod loan_product;
pub mod loan_repayment;
pub mod loan_schedule;
pub mod member;
pub mod savings_account;
pub mod savings_product;
pub mod savings_transaction;
pub mod share_account;
