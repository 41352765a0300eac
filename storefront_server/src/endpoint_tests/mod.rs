mod accounts;
mod helpers;
mod mocks;
mod order_flow;
mod orders;
mod payments;
