//! 订单号与金额校验
//!
//! 订单号是任意长度的十进制数字串，使用 Luhn 校验和。
//! 按位从低到高遍历，不做整数解析，因此不受长度限制。
//!
//! 金额以分为最小单位，与存储列 `NUMERIC(20, 2)` 一致。

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LoyaltyError, Result};

/// 金额保留的小数位数
pub const MONEY_SCALE: u32 = 2;

/// 校验订单号
///
/// - 空串或含非 ASCII 数字字符：`Err(InvalidFormat)`
/// - 格式合法：返回 Luhn 校验结果
///
/// 校验位（从右数第 0 位）保持不变，其后每隔一位（第 1、3、5… 位）翻倍，
/// 翻倍结果大于 9 时减 9，总和能被 10 整除即合法。
pub fn validate_order_number(number: &str) -> Result<bool> {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LoyaltyError::InvalidFormat(number.to_string()));
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(pos, b)| {
            let digit = u32::from(b - b'0');
            if pos % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .fold(0u32, |acc, d| (acc + d) % 10);

    Ok(sum == 0)
}

/// 校验订单号，校验和不通过时返回 `InvalidIdentifier`
pub fn ensure_valid_order_number(number: &str) -> Result<()> {
    if validate_order_number(number)? {
        Ok(())
    } else {
        Err(LoyaltyError::InvalidIdentifier(number.to_string()))
    }
}

/// 金额精度不能超过分，否则存储时各列分别舍入，余额恒等式不再成立
pub fn ensure_money_precision(amount: Decimal) -> Result<()> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LoyaltyError::InvalidAmount(format!(
            "金额最多保留 {} 位小数: {}",
            MONEY_SCALE, amount
        )));
    }
    Ok(())
}

/// 将外部给出的金额舍入到分（四舍五入，与 PostgreSQL NUMERIC 一致）
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_known_valid_numbers() {
        for number in ["79927398713", "12345678903", "0", "4561261212345467", "18"] {
            assert!(validate_order_number(number).unwrap(), "{number}");
        }
    }

    #[test]
    fn test_single_digit_alteration_is_detected() {
        let valid = "79927398713";
        for i in 0..valid.len() {
            let original = valid.as_bytes()[i];
            for replacement in b'0'..=b'9' {
                if replacement == original {
                    continue;
                }
                let mut altered = valid.as_bytes().to_vec();
                altered[i] = replacement;
                let altered = String::from_utf8(altered).unwrap();
                assert!(
                    !validate_order_number(&altered).unwrap(),
                    "altered number {altered} should fail"
                );
            }
        }
    }

    #[test]
    fn test_invalid_checksum() {
        assert!(!validate_order_number("79927398710").unwrap());
        assert!(!validate_order_number("12345678901").unwrap());
    }

    #[test]
    fn test_malformed_input() {
        for number in ["", "12a45", " 79927398713", "7992-7398713", "１２３"] {
            assert!(
                matches!(
                    validate_order_number(number),
                    Err(LoyaltyError::InvalidFormat(_))
                ),
                "{number:?}"
            );
        }
    }

    #[test]
    fn test_long_number_does_not_overflow() {
        // 40 位：远超 u64 范围
        let long = format!("{}{}", "0".repeat(29), "79927398713");
        assert!(validate_order_number(&long).unwrap());
    }

    #[test]
    fn test_ensure_valid_order_number() {
        assert!(ensure_valid_order_number("12345678903").is_ok());
        assert!(matches!(
            ensure_valid_order_number("12345678901"),
            Err(LoyaltyError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            ensure_valid_order_number("abc"),
            Err(LoyaltyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_seventy_digit_number_is_accepted() {
        let long = format!("{}{}", "0".repeat(60), "79927398713");
        assert_eq!(long.len(), 71);
        assert!(ensure_valid_order_number(&long).is_ok());
    }

    #[test]
    fn test_money_precision() {
        for ok in ["1", "0.5", "729.98", "100.00", "0.010", "-3.10"] {
            assert!(ensure_money_precision(dec(ok)).is_ok(), "{ok}");
        }
        for bad in ["0.005", "1.001", "729.985"] {
            assert!(
                matches!(
                    ensure_money_precision(dec(bad)),
                    Err(LoyaltyError::InvalidAmount(_))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec("0.005")), dec("0.01"));
        assert_eq!(round_money(dec("0.004")), dec("0"));
        assert_eq!(round_money(dec("729.985")), dec("729.99"));
        assert_eq!(round_money(dec("500.5")), dec("500.5"));
    }
}
