use storefront_common::Rupees;

use crate::GatewayApiError;

const MINOR_UNITS_PER_RUPEE: i64 = 100;

/// The gateway counts money in paise.
pub fn to_minor_units(amount: Rupees) -> Result<i64, GatewayApiError> {
    amount
        .value()
        .checked_mul(MINOR_UNITS_PER_RUPEE)
        .ok_or_else(|| GatewayApiError::InvalidCurrencyAmount(format!("{amount} is too large to charge")))
}

/// Store prices are whole rupees, so an amount with a paise component cannot be one of ours.
pub fn from_minor_units(paise: i64) -> Result<Rupees, GatewayApiError> {
    if paise % MINOR_UNITS_PER_RUPEE != 0 {
        return Err(GatewayApiError::InvalidCurrencyAmount(format!("{paise} paise is not a whole number of rupees")));
    }
    Ok(Rupees::from(paise / MINOR_UNITS_PER_RUPEE))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn paise() {
        assert_eq!(to_minor_units(Rupees::from(700)).unwrap(), 70_000);
        assert!(matches!(to_minor_units(Rupees::from(i64::MAX / 10)), Err(GatewayApiError::InvalidCurrencyAmount(_))));
        assert_eq!(from_minor_units(70_000).unwrap(), Rupees::from(700));
        assert!(matches!(from_minor_units(70_050), Err(GatewayApiError::InvalidCurrencyAmount(_))));
    }
}
