//! Arbitrary-precision decimals and integers
//!
//! A [`Dec`] is a sign, a coefficient of ASCII digits and a scale, so that
//! its value is `sign * coef * 10^-scale`. The representation is normalized:
//! no leading zeros in the coefficient, no trailing zeros while the scale is
//! positive, and zero is always `{0, "0", 0}`. Derived equality therefore is
//! value equality.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, NumericErrorKind, Result};
use crate::values::key::put_uvarint;

/// Arbitrary-precision decimal number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dec {
    sign: i8,
    coef: Vec<u8>,
    scale: u32,
}

/// Arbitrary-precision integer: a [`Dec`] with scale 0
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Int(Dec);

// ============================================================================
// Digit-string helpers (ASCII, most significant first)
// ============================================================================

fn strip_leading_zeros(d: &[u8]) -> &[u8] {
    let n = d.iter().take_while(|&&c| c == b'0').count();
    &d[n..]
}

fn cmp_digits(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn add_digits(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
    let (mut i, mut j, mut carry) = (a.len(), b.len(), 0u8);
    while i > 0 || j > 0 || carry > 0 {
        let mut sum = carry;
        if i > 0 {
            i -= 1;
            sum += a[i] - b'0';
        }
        if j > 0 {
            j -= 1;
            sum += b[j] - b'0';
        }
        out.push(b'0' + sum % 10);
        carry = sum / 10;
    }
    out.reverse();
    out
}

// Requires a >= b.
fn sub_digits(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len());
    let (mut i, mut j, mut borrow) = (a.len(), b.len(), 0i8);
    while i > 0 {
        i -= 1;
        let mut d = (a[i] - b'0') as i8 - borrow;
        if j > 0 {
            j -= 1;
            d -= (b[j] - b'0') as i8;
        }
        if d < 0 {
            d += 10;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out.push(b'0' + d as u8);
    }
    out.reverse();
    out
}

fn mul_digits(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut acc = vec![0u32; a.len() + b.len()];
    for i in (0..a.len()).rev() {
        let da = (a[i] - b'0') as u32;
        let mut carry = 0u32;
        for j in (0..b.len()).rev() {
            let t = acc[i + j + 1] + da * (b[j] - b'0') as u32 + carry;
            acc[i + j + 1] = t % 10;
            carry = t / 10;
        }
        acc[i] += carry;
    }
    acc.into_iter().map(|d| b'0' + d as u8).collect()
}

// ============================================================================
// Dec
// ============================================================================

impl Dec {
    /// The value zero
    pub fn zero() -> Self {
        Dec {
            sign: 0,
            coef: vec![b'0'],
            scale: 0,
        }
    }

    /// Build a normalized decimal from raw parts
    fn from_parts(negative: bool, mut digits: Vec<u8>, mut scale: u32) -> Self {
        while scale > 0 && digits.last() == Some(&b'0') {
            digits.pop();
            scale -= 1;
        }
        let lead = digits.iter().take_while(|&&d| d == b'0').count();
        digits.drain(..lead);
        if digits.is_empty() {
            return Self::zero();
        }
        Dec {
            sign: if negative { -1 } else { 1 },
            coef: digits,
            scale,
        }
    }

    /// Parse the `xs:decimal` lexical form
    pub fn parse(s: &str) -> Result<Self> {
        let err = |kind| Error::Numeric {
            kind,
            value: s.to_string(),
        };
        if s.is_empty() {
            return Err(err(NumericErrorKind::Empty));
        }

        let mut negative = false;
        let mut digits = Vec::with_capacity(s.len());
        let mut scale = 0u32;
        let mut seen_dot = false;
        let mut seen_digit = false;

        for (i, b) in s.bytes().enumerate() {
            match b {
                b'+' | b'-' => {
                    if i != 0 {
                        return Err(err(NumericErrorKind::MultipleSigns));
                    }
                    negative = b == b'-';
                }
                b'.' => {
                    if seen_dot {
                        return Err(err(NumericErrorKind::MultipleDots));
                    }
                    seen_dot = true;
                }
                b'0'..=b'9' => {
                    digits.push(b);
                    seen_digit = true;
                    if seen_dot {
                        scale = scale
                            .checked_add(1)
                            .ok_or_else(|| Error::Overflow(format!("decimal scale of '{}'", s)))?;
                    }
                }
                _ => return Err(err(NumericErrorKind::BadChar)),
            }
        }

        if !seen_digit {
            return Err(err(NumericErrorKind::NoDigits));
        }
        Ok(Self::from_parts(negative, digits, scale))
    }

    /// Decimal from a machine integer
    pub fn from_i128(n: i128) -> Self {
        Self::from_parts(n < 0, n.unsigned_abs().to_string().into_bytes(), 0)
    }

    /// Decimal from a machine integer
    pub fn from_i64(n: i64) -> Self {
        Self::from_i128(n as i128)
    }

    /// `10^n`
    pub fn pow10(n: u32) -> Self {
        let mut coef = Vec::with_capacity(n as usize + 1);
        coef.push(b'1');
        coef.resize(n as usize + 1, b'0');
        Dec {
            sign: 1,
            coef,
            scale: 0,
        }
    }

    /// Sign: -1, 0 or 1
    pub fn sign(&self) -> i8 {
        self.sign
    }

    /// Number of fraction digits
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Coefficient digits (ASCII)
    pub fn coefficient(&self) -> &[u8] {
        &self.coef
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    /// Whether the value has no fraction part
    pub fn is_integer(&self) -> bool {
        self.scale == 0
    }

    /// Number of significant digits as counted by `totalDigits`
    pub fn total_digits(&self) -> u32 {
        if self.is_zero() {
            1
        } else {
            (self.coef.len() as u32).max(self.scale)
        }
    }

    /// Number of fraction digits as counted by `fractionDigits`
    pub fn fraction_digits(&self) -> u32 {
        self.scale
    }

    /// Coefficient padded with zeros to the given (larger or equal) scale
    fn align(&self, scale: u32) -> Vec<u8> {
        let mut out = self.coef.clone();
        out.resize(self.coef.len() + (scale - self.scale) as usize, b'0');
        out
    }

    /// Negation
    pub fn neg(&self) -> Dec {
        let mut out = self.clone();
        out.sign = -out.sign;
        out
    }

    /// Absolute value
    pub fn abs(&self) -> Dec {
        let mut out = self.clone();
        out.sign = out.sign.abs();
        out
    }

    /// Sum
    pub fn add(&self, other: &Dec) -> Dec {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let scale = self.scale.max(other.scale);
        let a = self.align(scale);
        let b = other.align(scale);
        if self.sign == other.sign {
            return Self::from_parts(self.sign < 0, add_digits(&a, &b), scale);
        }
        match cmp_digits(&a, &b) {
            Ordering::Equal => Self::zero(),
            Ordering::Greater => Self::from_parts(self.sign < 0, sub_digits(&a, &b), scale),
            Ordering::Less => Self::from_parts(other.sign < 0, sub_digits(&b, &a), scale),
        }
    }

    /// Difference
    pub fn sub(&self, other: &Dec) -> Dec {
        self.add(&other.neg())
    }

    /// Product
    pub fn mul(&self, other: &Dec) -> Dec {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        Self::from_parts(
            self.sign != other.sign,
            mul_digits(&self.coef, &other.coef),
            self.scale + other.scale,
        )
    }

    /// Multiply by `10^exp` (exp may be negative)
    pub fn shift(&self, exp: i64) -> Dec {
        if self.is_zero() {
            return Self::zero();
        }
        if exp >= 0 {
            let exp = exp as u64;
            if exp <= self.scale as u64 {
                Self::from_parts(self.sign < 0, self.coef.clone(), self.scale - exp as u32)
            } else {
                let mut coef = self.coef.clone();
                coef.resize(coef.len() + (exp - self.scale as u64) as usize, b'0');
                Self::from_parts(self.sign < 0, coef, 0)
            }
        } else {
            let scale = (self.scale as u64).saturating_add(exp.unsigned_abs());
            Self::from_parts(
                self.sign < 0,
                self.coef.clone(),
                u32::try_from(scale).unwrap_or(u32::MAX),
            )
        }
    }

    /// Integer part, truncated toward zero
    pub fn trunc(&self) -> Int {
        if self.scale == 0 {
            return Int(self.clone());
        }
        let keep = self.coef.len().saturating_sub(self.scale as usize);
        Int(Self::from_parts(self.sign < 0, self.coef[..keep].to_vec(), 0))
    }

    /// Exact conversion to a scaled integer: `self * 10^scale`
    ///
    /// Fails when the value has more than `scale` fraction digits.
    pub fn to_scaled_int_exact(&self, scale: u32) -> Result<Int> {
        if self.scale > scale {
            return Err(Error::IndeterminateConversion(format!(
                "{} has more than {} fraction digits",
                self, scale
            )));
        }
        Ok(Int(Self::from_parts(self.sign < 0, self.align(scale), 0)))
    }

    /// Inverse of [`Dec::to_scaled_int_exact`]: `int * 10^-scale`
    pub fn from_scaled_int(int: &Int, scale: u32) -> Dec {
        Self::from_parts(int.0.sign < 0, int.0.coef.clone(), scale)
    }

    /// Exact conversion to an integer
    pub fn to_int_exact(&self) -> Result<Int> {
        self.to_scaled_int_exact(0)
    }

    /// Canonical `xs:decimal` lexical form: `-?digits.digits`
    pub fn to_canonical(&self) -> String {
        let digits = String::from_utf8_lossy(&self.coef);
        let scale = self.scale as usize;
        let mut out = String::with_capacity(digits.len() + scale + 3);
        if self.sign < 0 {
            out.push('-');
        }
        if scale == 0 {
            out.push_str(&digits);
            out.push_str(".0");
        } else if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            out.push_str(int);
            out.push('.');
            out.push_str(frac);
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take(scale - digits.len()));
            out.push_str(&digits);
        }
        out
    }

    /// Value key encoding: `{sign+1, uvarint(scale), uvarint(len), coef}`
    pub fn encode_key(&self, out: &mut Vec<u8>) {
        out.push((self.sign + 1) as u8);
        put_uvarint(out, self.scale as u64);
        put_uvarint(out, self.coef.len() as u64);
        out.extend_from_slice(&self.coef);
    }

    fn cmp_magnitude(&self, other: &Dec) -> Ordering {
        if self.is_zero() && other.is_zero() {
            return Ordering::Equal;
        }
        let ai = self.coef.len() as i64 - self.scale as i64;
        let bi = other.coef.len() as i64 - other.scale as i64;
        // normalized coefficients: equal integer width compares digit-wise
        ai.cmp(&bi).then_with(|| self.coef.cmp(&other.coef))
    }
}

impl Ord for Dec {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.sign.cmp(&other.sign) {
            Ordering::Equal => {}
            ord => return ord,
        }
        let mag = self.cmp_magnitude(other);
        if self.sign < 0 {
            mag.reverse()
        } else {
            mag
        }
    }
}

impl PartialOrd for Dec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl From<Int> for Dec {
    fn from(int: Int) -> Self {
        int.0
    }
}

// ============================================================================
// Int
// ============================================================================

impl Int {
    /// The value zero
    pub fn zero() -> Self {
        Int(Dec::zero())
    }

    /// Parse the `xs:integer` lexical form
    pub fn parse(s: &str) -> Result<Self> {
        if s.contains('.') {
            return Err(Error::Numeric {
                kind: NumericErrorKind::BadChar,
                value: s.to_string(),
            });
        }
        Ok(Int(Dec::parse(s)?))
    }

    /// Integer from a machine integer
    pub fn from_i128(n: i128) -> Self {
        Int(Dec::from_i128(n))
    }

    /// Integer from a machine integer
    pub fn from_i64(n: i64) -> Self {
        Int(Dec::from_i64(n))
    }

    /// View as a decimal
    pub fn as_dec(&self) -> &Dec {
        &self.0
    }

    /// Sign: -1, 0 or 1
    pub fn sign(&self) -> i8 {
        self.0.sign
    }

    /// Whether the value is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum
    pub fn add(&self, other: &Int) -> Int {
        Int(self.0.add(&other.0))
    }

    /// Product
    pub fn mul(&self, other: &Int) -> Int {
        Int(self.0.mul(&other.0))
    }

    /// Negation
    pub fn neg(&self) -> Int {
        Int(self.0.neg())
    }

    /// Conversion to a machine integer
    pub fn to_i128(&self) -> Result<i128> {
        let mut acc: i128 = 0;
        for &d in &self.0.coef {
            acc = acc
                .checked_mul(10)
                .and_then(|v| v.checked_add((d - b'0') as i128))
                .ok_or_else(|| Error::Overflow(format!("integer {} does not fit 128 bits", self)))?;
        }
        Ok(if self.0.sign < 0 { -acc } else { acc })
    }

    /// Conversion to a machine integer
    pub fn to_i64(&self) -> Result<i64> {
        let v = self.to_i128()?;
        i64::try_from(v).map_err(|_| Error::Overflow(format!("integer {} does not fit 64 bits", self)))
    }

    /// Conversion to an unsigned machine integer
    pub fn to_u64(&self) -> Result<u64> {
        let v = self.to_i128()?;
        u64::try_from(v).map_err(|_| {
            Error::Overflow(format!("integer {} does not fit unsigned 64 bits", self))
        })
    }

    /// Canonical `xs:integer` lexical form: `-?digits`
    pub fn to_canonical(&self) -> String {
        let mut out = String::with_capacity(self.0.coef.len() + 1);
        if self.0.sign < 0 {
            out.push('-');
        }
        out.push_str(&String::from_utf8_lossy(&self.0.coef));
        out
    }

    /// Value key encoding, same layout as decimals with scale 0
    pub fn encode_key(&self, out: &mut Vec<u8>) {
        self.0.encode_key(out)
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}
