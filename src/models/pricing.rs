use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Convenience fee charged on the original seat price.
const CONVENIENCE_FEE_PCT: f64 = 5.0;
/// Tax charged on the original seat price.
const TAX_PCT: f64 = 18.0;

/// A requested seat inside a group invite, priced at invite-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteSeat {
    pub seat_id: String,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: Uuid,
    pub seat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub discount_pct: u32,
}

/// A multi-participant booking where seats are filled incrementally by
/// joiners. Reads showtime pricing at creation time; independent afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInvite {
    pub showtime_id: Uuid,
    pub seats: Vec<InviteSeat>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub coupon: Option<Coupon>,
}

/// Price breakdown for the next joiner of a group invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinerQuote {
    pub seat_id: String,
    pub base_price: i64,
    pub discount: i64,
    pub discounted_price: i64,
    pub convenience_fee: i64,
    pub tax: i64,
    pub final_amount: i64,
}

fn round_pct(amount: i64, pct: f64) -> i64 {
    (amount as f64 * pct / 100.0).round() as i64
}

/// Computes the price owed by the next joiner: the seat at index
/// = current participant count in the invite's ordered seat list.
///
/// The coupon discounts the base price; convenience fee and tax are always
/// computed on the original price, not the discounted one. Pure function,
/// never touches inventory.
pub fn compute_joiner_price(invite: &GroupInvite) -> Result<JoinerQuote> {
    let seat = invite
        .seats
        .get(invite.participants.len())
        .ok_or_else(|| Error::Conflict("no seats available for this invite".to_string()))?;

    let discount = invite
        .coupon
        .as_ref()
        .map(|c| round_pct(seat.price, c.discount_pct as f64))
        .unwrap_or(0);
    let discounted_price = seat.price - discount;
    let convenience_fee = round_pct(seat.price, CONVENIENCE_FEE_PCT);
    let tax = round_pct(seat.price, TAX_PCT);

    Ok(JoinerQuote {
        seat_id: seat.seat_id.clone(),
        base_price: seat.price,
        discount,
        discounted_price,
        convenience_fee,
        tax,
        final_amount: discounted_price + convenience_fee + tax,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(seats: Vec<InviteSeat>, joined: usize, coupon: Option<Coupon>) -> GroupInvite {
        let participants = (0..joined)
            .map(|i| Participant {
                user_id: Uuid::new_v4(),
                seat_id: seats[i].seat_id.clone(),
            })
            .collect();
        GroupInvite {
            showtime_id: Uuid::new_v4(),
            seats,
            participants,
            coupon,
        }
    }

    #[test]
    fn coupon_discount_fee_and_tax() {
        // Base 200, 10% coupon: discount 20, fee 10, tax 36, total 226.
        let inv = invite(
            vec![InviteSeat { seat_id: "B4".to_string(), price: 200 }],
            0,
            Some(Coupon { code: "SAVE10".to_string(), discount_pct: 10 }),
        );
        let q = compute_joiner_price(&inv).unwrap();
        assert_eq!(q.discount, 20);
        assert_eq!(q.discounted_price, 180);
        assert_eq!(q.convenience_fee, 10);
        assert_eq!(q.tax, 36);
        assert_eq!(q.final_amount, 226);
    }

    #[test]
    fn no_coupon_means_no_discount() {
        let inv = invite(
            vec![InviteSeat { seat_id: "A1".to_string(), price: 550 }],
            0,
            None,
        );
        let q = compute_joiner_price(&inv).unwrap();
        assert_eq!(q.discount, 0);
        assert_eq!(q.discounted_price, 550);
        assert_eq!(q.convenience_fee, 28); // round(27.5)
        assert_eq!(q.tax, 99);
        assert_eq!(q.final_amount, 677);
    }

    #[test]
    fn next_seat_follows_participant_count() {
        let inv = invite(
            vec![
                InviteSeat { seat_id: "A1".to_string(), price: 550 },
                InviteSeat { seat_id: "A2".to_string(), price: 300 },
            ],
            1,
            None,
        );
        let q = compute_joiner_price(&inv).unwrap();
        assert_eq!(q.seat_id, "A2");
        assert_eq!(q.base_price, 300);
    }

    #[test]
    fn exhausted_invite_fails() {
        let inv = invite(
            vec![InviteSeat { seat_id: "A1".to_string(), price: 550 }],
            1,
            None,
        );
        assert!(matches!(
            compute_joiner_price(&inv),
            Err(Error::Conflict(_))
        ));
    }
}
