pub mod fsm;
pub mod history;
