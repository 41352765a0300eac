//! # Order transition table
//!
//! An order carries several status axes: the fulfilment status, the payment status, the coin status and the two
//! customer request sub-states (cancellation and return). They are not independent. Cancelling an order voids its
//! payment and its pending coins, delivering it collects cash-on-delivery payments, and so on.
//!
//! This module encodes every legal move as a pure function from an [`OrderState`] snapshot to a [`Transition`]. No I/O
//! happens here. The database backends persist the resulting state together with the wallet effects the transition
//! carries (`refund_coins` and `settle_coins`) in a single atomic step.
//!
//! The cross-axis effects of entering a new fulfilment status are listed once, in [`CROSS_RULES`]:
//!
//! | Entering             | Effect                                                            |
//! |----------------------|-------------------------------------------------------------------|
//! | delivered            | payment is `Paid` (cash collected on delivery), delivery recorded |
//! | pending / confirmed  | payment is `Pending` unless already `Paid`                        |
//! | cancelled            | payment `Pending → Failed`, `Paid → Refunded`                     |
//! | returned             | payment `Paid → Refunded`                                         |
//! | cancelled / returned | pending coins are cancelled                                       |
//! | cancelled / returned | redeemed coins are refunded to the wallet                         |
//! | cancelled / returned | a pending customer request for the reversal is marked approved    |
//!
//! Admin status changes only move forward through `pending → confirmed → shipped → delivered` (skipping is allowed),
//! or to `cancelled` from any state before delivery. `returned` can only be reached through an approved return request.
//! `cancelled` and `returned` are terminal.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::Coins;
use thiserror::Error;

use crate::db_types::{
    CoinStatus,
    CustomerRequest,
    Order,
    OrderStatusType,
    PaymentStatus,
    RequestStatus,
    Resolution,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("The order is already {0}")]
    NoOp(OrderStatusType),
    #[error("An order cannot move from {from} to {to}")]
    Forbidden { from: OrderStatusType, to: OrderStatusType },
    #[error("An order that is {0} can no longer be cancelled")]
    NotCancellable(OrderStatusType),
    #[error("Only delivered orders can be returned. This order is {0}")]
    NotDelivered(OrderStatusType),
    #[error("A request is already pending for this order")]
    AlreadyRequested,
    #[error("There is no pending request to resolve")]
    NoPendingRequest,
    #[error("The return window closed at {0}")]
    ReturnWindowExpired(DateTime<Utc>),
    #[error("Coins for this order are already {0}")]
    CoinsNotPending(CoinStatus),
    #[error("Coins for this order only mature at {0}")]
    NotMatured(DateTime<Utc>),
    #[error("Coins cannot be settled for this order: {0}")]
    NotSettleable(String),
}

/// A snapshot of every mutable status axis of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState {
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub coin_status: CoinStatus,
    pub cancellation: CustomerRequest,
    pub return_request: CustomerRequest,
    pub coins_earned: Coins,
    pub coins_redeemed: Coins,
    pub coin_credit_date: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderState {
    fn from(order: &Order) -> Self {
        // Orders delivered before delivery times were tracked fall back to their last modification time
        let delivered_at = match order.order_status {
            OrderStatusType::Delivered | OrderStatusType::Returned => order.delivered_at.or(Some(order.updated_at)),
            _ => order.delivered_at,
        };
        Self {
            order_status: order.order_status,
            payment_status: order.payment_status,
            coin_status: order.coin_status,
            cancellation: order.cancellation.clone(),
            return_request: order.return_request.clone(),
            coins_earned: order.coins_earned,
            coins_redeemed: order.coins_redeemed,
            coin_credit_date: order.coin_credit_date,
            delivered_at,
        }
    }
}

/// The outcome of a legal move. The wallet effects must be committed together with `next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: OrderState,
    /// Redeemed coins to give back to the order's owner
    pub refund_coins: Coins,
    /// Earned coins to credit to the order's owner
    pub settle_coins: Coins,
}

impl Transition {
    fn unchanged_wallet(next: OrderState) -> Self {
        Self { next, refund_coins: Coins::zero(), settle_coins: Coins::zero() }
    }
}

/// A side effect that accompanies entering a fulfilment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossRule {
    DeliveryCollectsPayment,
    EarlyStatusKeepsPaymentPending,
    ReversalVoidsPayment,
    ReversalCancelsPendingCoins,
    ReversalRefundsRedemption,
    ReversalResolvesPendingRequest,
}

pub const CROSS_RULES: [CrossRule; 6] = [
    CrossRule::DeliveryCollectsPayment,
    CrossRule::EarlyStatusKeepsPaymentPending,
    CrossRule::ReversalVoidsPayment,
    CrossRule::ReversalCancelsPendingCoins,
    CrossRule::ReversalRefundsRedemption,
    CrossRule::ReversalResolvesPendingRequest,
];

impl CrossRule {
    /// Applies the rule to `state`, which has just entered `entering`. Returns the coins to refund, if any.
    pub fn apply(&self, state: &mut OrderState, entering: OrderStatusType, now: DateTime<Utc>) -> Coins {
        use OrderStatusType::*;
        match (self, entering) {
            (Self::DeliveryCollectsPayment, Delivered) => {
                state.payment_status = PaymentStatus::Paid;
                state.delivered_at = Some(now);
            },
            (Self::EarlyStatusKeepsPaymentPending, Pending | Confirmed) => {
                if state.payment_status != PaymentStatus::Paid {
                    state.payment_status = PaymentStatus::Pending;
                }
            },
            (Self::ReversalVoidsPayment, Cancelled | Returned) => {
                state.payment_status = match state.payment_status {
                    PaymentStatus::Pending => PaymentStatus::Failed,
                    PaymentStatus::Paid => PaymentStatus::Refunded,
                    other => other,
                };
            },
            (Self::ReversalCancelsPendingCoins, Cancelled | Returned) => {
                if state.coin_status == CoinStatus::Pending {
                    state.coin_status = CoinStatus::Cancelled;
                }
            },
            (Self::ReversalRefundsRedemption, Cancelled | Returned) => {
                return state.coins_redeemed;
            },
            (Self::ReversalResolvesPendingRequest, Cancelled) => {
                if state.cancellation.is_pending() {
                    state.cancellation.status = Some(RequestStatus::Approved);
                }
            },
            (Self::ReversalResolvesPendingRequest, Returned) => {
                if state.return_request.is_pending() {
                    state.return_request.status = Some(RequestStatus::Approved);
                }
            },
            _ => {},
        }
        Coins::zero()
    }
}

/// Moves `state` into `status` and applies every cross rule.
fn enter(state: &OrderState, status: OrderStatusType, now: DateTime<Utc>) -> Transition {
    let mut next = state.clone();
    next.order_status = status;
    let refund_coins = CROSS_RULES.iter().map(|rule| rule.apply(&mut next, status, now)).sum();
    Transition { next, refund_coins, settle_coins: Coins::zero() }
}

/// An admin sets the fulfilment status directly.
pub fn admin_set_status(
    state: &OrderState,
    target: OrderStatusType,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    let current = state.order_status;
    if current == target {
        return Err(TransitionError::NoOp(target));
    }
    let forbidden = TransitionError::Forbidden { from: current, to: target };
    match (current.fulfilment_rank(), target) {
        (None, _) => Err(forbidden),
        (_, OrderStatusType::Returned) => Err(forbidden),
        (Some(_), OrderStatusType::Cancelled) if current.is_cancellable() => Ok(enter(state, target, now)),
        (Some(_), OrderStatusType::Cancelled) => Err(forbidden),
        (Some(from), _) => match target.fulfilment_rank() {
            Some(to) if to > from => Ok(enter(state, target, now)),
            _ => Err(forbidden),
        },
    }
}

/// A user asks for their order to be cancelled. The fulfilment status does not change.
pub fn request_cancellation(
    state: &OrderState,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if !state.order_status.is_cancellable() {
        return Err(TransitionError::NotCancellable(state.order_status));
    }
    if state.cancellation.is_pending() {
        return Err(TransitionError::AlreadyRequested);
    }
    let mut next = state.clone();
    next.cancellation = CustomerRequest::new(reason.to_string(), now);
    Ok(Transition::unchanged_wallet(next))
}

pub fn resolve_cancellation(
    state: &OrderState,
    resolution: Resolution,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if !state.cancellation.is_pending() {
        return Err(TransitionError::NoPendingRequest);
    }
    match resolution {
        Resolution::Approved => {
            if !state.order_status.is_cancellable() {
                return Err(TransitionError::NotCancellable(state.order_status));
            }
            Ok(enter(state, OrderStatusType::Cancelled, now))
        },
        Resolution::Rejected => {
            let mut next = state.clone();
            next.cancellation.requested = false;
            next.cancellation.status = Some(RequestStatus::Rejected);
            Ok(Transition::unchanged_wallet(next))
        },
    }
}

/// A user asks to return a delivered order. Only allowed within `window` of the delivery.
pub fn request_return(
    state: &OrderState,
    reason: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<Transition, TransitionError> {
    if state.order_status != OrderStatusType::Delivered {
        return Err(TransitionError::NotDelivered(state.order_status));
    }
    if state.return_request.is_pending() {
        return Err(TransitionError::AlreadyRequested);
    }
    let delivered_at = state.delivered_at.ok_or(TransitionError::NotDelivered(state.order_status))?;
    let closes_at = delivered_at + window;
    if now > closes_at {
        return Err(TransitionError::ReturnWindowExpired(closes_at));
    }
    let mut next = state.clone();
    next.return_request = CustomerRequest::new(reason.to_string(), now);
    Ok(Transition::unchanged_wallet(next))
}

pub fn resolve_return(
    state: &OrderState,
    resolution: Resolution,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if !state.return_request.is_pending() {
        return Err(TransitionError::NoPendingRequest);
    }
    match resolution {
        Resolution::Approved => {
            if state.order_status != OrderStatusType::Delivered {
                return Err(TransitionError::NotDelivered(state.order_status));
            }
            Ok(enter(state, OrderStatusType::Returned, now))
        },
        Resolution::Rejected => {
            let mut next = state.clone();
            next.return_request.requested = false;
            next.return_request.status = Some(RequestStatus::Rejected);
            Ok(Transition::unchanged_wallet(next))
        },
    }
}

/// Matured coins on a paid, unreversed order are credited to the owner.
pub fn settle_coins(state: &OrderState, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
    if state.coin_status != CoinStatus::Pending {
        return Err(TransitionError::CoinsNotPending(state.coin_status));
    }
    if state.order_status.is_reversal() {
        return Err(TransitionError::NotSettleable(format!("the order is {}", state.order_status)));
    }
    if state.payment_status != PaymentStatus::Paid {
        return Err(TransitionError::NotSettleable(format!("payment is {}", state.payment_status)));
    }
    if now < state.coin_credit_date {
        return Err(TransitionError::NotMatured(state.coin_credit_date));
    }
    let mut next = state.clone();
    next.coin_status = CoinStatus::Credited;
    Ok(Transition { next, refund_coins: Coins::zero(), settle_coins: state.coins_earned })
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn fresh(payment_status: PaymentStatus) -> OrderState {
        OrderState {
            order_status: OrderStatusType::Pending,
            payment_status,
            coin_status: CoinStatus::Pending,
            cancellation: CustomerRequest::default(),
            return_request: CustomerRequest::default(),
            coins_earned: Coins::from(70),
            coins_redeemed: Coins::from(300),
            coin_credit_date: t0() + Duration::days(10),
            delivered_at: None,
        }
    }

    #[test]
    fn forward_progression_with_skips() {
        let s = fresh(PaymentStatus::Pending);
        let t = admin_set_status(&s, OrderStatusType::Shipped, t0()).unwrap();
        assert_eq!(t.next.order_status, OrderStatusType::Shipped);
        assert_eq!(t.next.payment_status, PaymentStatus::Pending);
        assert!(t.refund_coins.is_zero());
        let err = admin_set_status(&t.next, OrderStatusType::Confirmed, t0()).unwrap_err();
        assert!(matches!(err, TransitionError::Forbidden { .. }));
    }

    #[test]
    fn setting_the_same_status_is_a_no_op() {
        let s = fresh(PaymentStatus::Pending);
        assert_eq!(admin_set_status(&s, OrderStatusType::Pending, t0()), Err(TransitionError::NoOp(OrderStatusType::Pending)));
    }

    #[test]
    fn delivery_collects_cod_payment() {
        let s = fresh(PaymentStatus::Pending);
        let t = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap();
        assert_eq!(t.next.payment_status, PaymentStatus::Paid);
        assert_eq!(t.next.delivered_at, Some(t0()));
        assert_eq!(t.next.coin_status, CoinStatus::Pending);
    }

    #[test]
    fn admin_cancel_voids_payment_refunds_and_cancels_coins() {
        let s = fresh(PaymentStatus::Pending);
        let t = admin_set_status(&s, OrderStatusType::Cancelled, t0()).unwrap();
        assert_eq!(t.next.payment_status, PaymentStatus::Failed);
        assert_eq!(t.next.coin_status, CoinStatus::Cancelled);
        assert_eq!(t.refund_coins, Coins::from(300));

        let paid = fresh(PaymentStatus::Paid);
        let t = admin_set_status(&paid, OrderStatusType::Cancelled, t0()).unwrap();
        assert_eq!(t.next.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn admin_cannot_cancel_delivered_or_set_returned() {
        let s = fresh(PaymentStatus::Pending);
        let delivered = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap().next;
        assert!(admin_set_status(&delivered, OrderStatusType::Cancelled, t0()).is_err());
        assert!(admin_set_status(&delivered, OrderStatusType::Returned, t0()).is_err());
    }

    #[test]
    fn admin_cancel_approves_a_pending_request() {
        let s = fresh(PaymentStatus::Pending);
        let requested = request_cancellation(&s, "changed my mind", t0()).unwrap().next;
        let t = admin_set_status(&requested, OrderStatusType::Cancelled, t0()).unwrap();
        assert_eq!(t.next.cancellation.status, Some(RequestStatus::Approved));
    }

    #[test]
    fn cancellation_request_and_approval() {
        let s = fresh(PaymentStatus::Pending);
        let t = request_cancellation(&s, "wrong size", t0()).unwrap();
        assert_eq!(t.next.order_status, OrderStatusType::Pending);
        assert!(t.next.cancellation.requested);
        assert_eq!(request_cancellation(&t.next, "again", t0()), Err(TransitionError::AlreadyRequested));
        let approved = resolve_cancellation(&t.next, Resolution::Approved, t0()).unwrap();
        assert_eq!(approved.next.order_status, OrderStatusType::Cancelled);
        assert_eq!(approved.next.coin_status, CoinStatus::Cancelled);
        assert_eq!(approved.next.cancellation.status, Some(RequestStatus::Approved));
        assert_eq!(approved.refund_coins, Coins::from(300));
        assert_eq!(
            resolve_cancellation(&approved.next, Resolution::Approved, t0()),
            Err(TransitionError::NoPendingRequest)
        );
    }

    #[test]
    fn rejected_cancellation_can_be_resubmitted() {
        let s = fresh(PaymentStatus::Pending);
        let requested = request_cancellation(&s, "late", t0()).unwrap().next;
        let rejected = resolve_cancellation(&requested, Resolution::Rejected, t0()).unwrap();
        assert_eq!(rejected.next.order_status, OrderStatusType::Pending);
        assert!(!rejected.next.cancellation.requested);
        assert_eq!(rejected.next.cancellation.status, Some(RequestStatus::Rejected));
        assert!(request_cancellation(&rejected.next, "still late", t0()).is_ok());
    }

    #[test]
    fn delivered_orders_cannot_be_cancelled() {
        let s = fresh(PaymentStatus::Pending);
        let delivered = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap().next;
        assert_eq!(
            request_cancellation(&delivered, "too late", t0()),
            Err(TransitionError::NotCancellable(OrderStatusType::Delivered))
        );
    }

    #[test]
    fn return_window() {
        let s = fresh(PaymentStatus::Pending);
        let delivered = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap().next;
        let window = Duration::hours(24);
        let late = request_return(&delivered, "broken", t0() + Duration::hours(25), window);
        assert!(matches!(late, Err(TransitionError::ReturnWindowExpired(_))));
        let ok = request_return(&delivered, "broken", t0() + Duration::hours(23), window).unwrap();
        assert!(ok.next.return_request.is_pending());
        let edge = request_return(&delivered, "broken", t0() + window, window);
        assert!(edge.is_ok());
        assert_eq!(
            request_return(&ok.next, "again", t0() + Duration::hours(23), window),
            Err(TransitionError::AlreadyRequested)
        );
    }

    #[test]
    fn approved_return_refunds() {
        let s = fresh(PaymentStatus::Pending);
        let delivered = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap().next;
        let requested = request_return(&delivered, "broken", t0(), Duration::hours(24)).unwrap().next;
        let t = resolve_return(&requested, Resolution::Approved, t0()).unwrap();
        assert_eq!(t.next.order_status, OrderStatusType::Returned);
        assert_eq!(t.next.payment_status, PaymentStatus::Refunded);
        assert_eq!(t.next.coin_status, CoinStatus::Cancelled);
        assert_eq!(t.next.return_request.status, Some(RequestStatus::Approved));
        assert_eq!(t.refund_coins, Coins::from(300));

        let rejected = resolve_return(&requested, Resolution::Rejected, t0()).unwrap();
        assert_eq!(rejected.next.order_status, OrderStatusType::Delivered);
        assert!(!rejected.next.return_request.requested);
    }

    #[test]
    fn returns_need_delivery() {
        let s = fresh(PaymentStatus::Paid);
        assert_eq!(
            request_return(&s, "nope", t0(), Duration::hours(24)),
            Err(TransitionError::NotDelivered(OrderStatusType::Pending))
        );
    }

    #[test]
    fn settlement_rules() {
        let s = fresh(PaymentStatus::Pending);
        let delivered = admin_set_status(&s, OrderStatusType::Delivered, t0()).unwrap().next;
        assert!(matches!(settle_coins(&delivered, t0()), Err(TransitionError::NotMatured(_))));
        let t = settle_coins(&delivered, t0() + Duration::days(11)).unwrap();
        assert_eq!(t.next.coin_status, CoinStatus::Credited);
        assert_eq!(t.settle_coins, Coins::from(70));
        assert_eq!(
            settle_coins(&t.next, t0() + Duration::days(12)),
            Err(TransitionError::CoinsNotPending(CoinStatus::Credited))
        );
        // unpaid COD orders do not settle
        assert!(matches!(settle_coins(&s, t0() + Duration::days(11)), Err(TransitionError::NotSettleable(_))));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Admin(OrderStatusType),
        RequestCancel,
        ResolveCancel(bool),
        RequestReturn(i64),
        ResolveReturn(bool),
        Settle(i64),
    }

    fn any_status() -> impl Strategy<Value = OrderStatusType> {
        prop_oneof![
            Just(OrderStatusType::Pending),
            Just(OrderStatusType::Confirmed),
            Just(OrderStatusType::Shipped),
            Just(OrderStatusType::Delivered),
            Just(OrderStatusType::Cancelled),
            Just(OrderStatusType::Returned),
        ]
    }

    fn any_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any_status().prop_map(Op::Admin),
            Just(Op::RequestCancel),
            any::<bool>().prop_map(Op::ResolveCancel),
            (0i64..48).prop_map(Op::RequestReturn),
            any::<bool>().prop_map(Op::ResolveReturn),
            (0i64..20).prop_map(Op::Settle),
        ]
    }

    fn run(state: &OrderState, op: &Op) -> Result<Transition, TransitionError> {
        let window = Duration::hours(24);
        let approve = |b: bool| if b { Resolution::Approved } else { Resolution::Rejected };
        match op {
            Op::Admin(s) => admin_set_status(state, *s, t0()),
            Op::RequestCancel => request_cancellation(state, "reason", t0()),
            Op::ResolveCancel(b) => resolve_cancellation(state, approve(*b), t0()),
            Op::RequestReturn(h) => request_return(state, "reason", t0() + Duration::hours(*h), window),
            Op::ResolveReturn(b) => resolve_return(state, approve(*b), t0()),
            Op::Settle(d) => settle_coins(state, t0() + Duration::days(*d)),
        }
    }

    proptest! {
        #[test]
        fn coin_status_is_monotonic(paid in any::<bool>(), ops in prop::collection::vec(any_op(), 1..40)) {
            let payment = if paid { PaymentStatus::Paid } else { PaymentStatus::Pending };
            let mut state = fresh(payment);
            let mut refunded = Coins::zero();
            let mut settled = Coins::zero();
            for op in &ops {
                if let Ok(t) = run(&state, op) {
                    if state.coin_status.is_terminal() {
                        prop_assert_eq!(t.next.coin_status, state.coin_status);
                    }
                    refunded += t.refund_coins;
                    settled += t.settle_coins;
                    state = t.next;
                }
            }
            prop_assert!(refunded <= state.coins_redeemed);
            prop_assert!(settled <= state.coins_earned);
        }
    }
}
