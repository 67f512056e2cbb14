//! Coefficient fields for matrix cells.
//!
//! * [`Z2`] is zero-sized: its only non-zero coefficient is implicit, so cells store nothing.
//! * [`PrimeField`] is `Z/p` for a prime chosen at runtime.
//! * [`MultiField`] is the product of every prime field in a range, combined via CRT,
//!   which computes persistence over all of those characteristics at once.
//!
//! A field is an explicit context object: build it once and hand it to the matrix,
//! which passes it by reference to every column operation.

use std::fmt::Debug;
use std::num::NonZeroU64;
use std::ops::{Add, Mul, Neg, Sub};

use num::Integer;

use crate::PersmatError;

/// Arithmetic on the non-zero coefficients stored in cells.
///
/// It is impossible to construct a coefficient that represents `0`.
/// Instead, `0` is represented by the absence of a cell, and every operation that may produce `0`
/// returns [`None`].
pub trait FieldOperators: Clone + Debug {
    type Coeff: Copy + Eq + Debug;

    /// The modulus; for a [`MultiField`] this is the product of all its primes.
    fn characteristic(&self) -> u64;
    fn one(&self) -> Self::Coeff;
    /// Normalises `value` modulo the characteristic.
    fn coefficient(&self, value: u64) -> Option<Self::Coeff>;
    fn value(&self, coeff: Self::Coeff) -> u64;
    fn add(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff>;
    /// Can only return [`None`] over a [`MultiField`], which has zero divisors.
    fn multiply(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff>;
    fn additive_inverse(&self, a: Self::Coeff) -> Self::Coeff;
    /// [`None`] when `a` is not a unit.
    fn inverse(&self, a: Self::Coeff) -> Option<Self::Coeff>;

    fn signed_coefficient(&self, value: i64) -> Option<Self::Coeff> {
        let modulus = i128::from(self.characteristic());
        let normalised = i128::from(value).rem_euclid(modulus);
        self.coefficient(normalised as u64)
    }

    fn subtract(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff> {
        self.add(a, self.additive_inverse(b))
    }

    fn add_option(&self, a: Self::Coeff, b: Option<Self::Coeff>) -> Option<Self::Coeff> {
        match b {
            None => Some(a),
            Some(b) => self.add(a, b),
        }
    }

    fn is_one(&self, a: Self::Coeff) -> bool {
        a == self.one()
    }
}

// ======== Z2 =================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Z2;

impl Add<Z2> for Z2 {
    type Output = Option<Z2>;

    fn add(self, _rhs: Z2) -> Self::Output {
        None
    }
}

impl Add<Option<Z2>> for Z2 {
    type Output = Option<Z2>;

    fn add(self, rhs: Option<Z2>) -> Self::Output {
        match rhs {
            None => Some(self),
            Some(rhs) => self + rhs,
        }
    }
}

impl Mul<Z2> for Z2 {
    type Output = Z2;

    // 1 * 1 = 1
    fn mul(self, _rhs: Z2) -> Self::Output {
        Z2
    }
}

impl FieldOperators for Z2 {
    type Coeff = Z2;

    fn characteristic(&self) -> u64 {
        2
    }

    fn one(&self) -> Self::Coeff {
        Z2
    }

    fn coefficient(&self, value: u64) -> Option<Self::Coeff> {
        (value % 2 == 1).then_some(Z2)
    }

    fn value(&self, _coeff: Self::Coeff) -> u64 {
        1
    }

    fn add(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff> {
        a + b
    }

    fn multiply(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff> {
        Some(a * b)
    }

    fn additive_inverse(&self, a: Self::Coeff) -> Self::Coeff {
        a
    }

    fn inverse(&self, a: Self::Coeff) -> Option<Self::Coeff> {
        Some(a)
    }
}

// ======== Modular arithmetic =================================

// All helpers expect operands already reduced into [0, m).
// Sums are formed without ever exceeding m, so any m < 2^64 is safe.

pub(crate) fn add_mod(a: u64, b: u64, m: u64) -> u64 {
    if a >= m - b {
        a - (m - b)
    } else {
        a + b
    }
}

pub(crate) fn sub_mod(a: u64, b: u64, m: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        a + (m - b)
    }
}

/// Double-and-add multiplication; `a * b` itself may not fit in a `u64`.
pub(crate) fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    let (mut a, mut b) = if b < a { (b, a) } else { (a, b) };
    let mut result = 0;
    while a != 0 {
        if a & 1 == 1 {
            result = add_mod(result, b, m);
        }
        a >>= 1;
        b = add_mod(b, b, m);
    }
    result
}

/// Square-and-multiply exponentiation.
pub(crate) fn pow_mod(base: u64, mut exponent: u64, m: u64) -> u64 {
    let mut base = base % m;
    let mut result = 1 % m;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        exponent >>= 1;
        base = mul_mod(base, base, m);
    }
    result
}

pub(crate) fn inverse_mod(a: u64, m: u64) -> Option<u64> {
    let egcd = i128::from(a).extended_gcd(&i128::from(m));
    (egcd.gcd == 1).then(|| egcd.x.rem_euclid(i128::from(m)) as u64)
}

pub(crate) fn is_prime(p: u64) -> bool {
    if p <= 1 {
        return false;
    }
    if p <= 3 {
        return true;
    }
    if p % 2 == 0 || p % 3 == 0 {
        return false;
    }
    let mut i = 5u64;
    while i.checked_mul(i).is_some_and(|square| square <= p) {
        if p % i == 0 || p % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// A ring `Z/m`, exposing arithmetic on plain values (zero included).
pub trait ModularRing: Clone + Debug {
    fn modulus(&self) -> u64;

    fn element(&self, value: u64) -> FieldElement<'_, Self> {
        FieldElement {
            value: value % self.modulus(),
            ring: self,
        }
    }

    fn signed_element(&self, value: i64) -> FieldElement<'_, Self> {
        let normalised = i128::from(value).rem_euclid(i128::from(self.modulus()));
        FieldElement {
            value: normalised as u64,
            ring: self,
        }
    }

    fn additive_identity(&self) -> FieldElement<'_, Self> {
        self.element(0)
    }

    fn multiplicative_identity(&self) -> FieldElement<'_, Self> {
        self.element(1)
    }
}

// ======== Z/p ================================================

/// The finite field `Z/p` for a runtime prime `p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimeField {
    prime: u64,
}

impl PrimeField {
    pub fn new(prime: u64) -> Result<Self, PersmatError> {
        if !is_prime(prime) {
            return Err(PersmatError::InvalidConfiguration(format!(
                "characteristic {prime} is not prime"
            )));
        }
        Ok(Self { prime })
    }

    pub fn prime(&self) -> u64 {
        self.prime
    }
}

impl ModularRing for PrimeField {
    fn modulus(&self) -> u64 {
        self.prime
    }
}

// ======== Multi-field ========================================

/// The product of the prime fields `Z/p` for every prime `p` in a range.
///
/// An element is a single residue modulo `M`, the product of the primes, and encodes one residue
/// per prime via the Chinese remainder theorem.
/// For each prime `p_i` the idempotent `e_i = (M / p_i)^(p_i - 1) mod M` is `1` modulo `p_i` and
/// `0` modulo every other prime; sums of these select a subset of the components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiField {
    primes: Vec<u64>,
    product: u64,
    partials: Vec<u64>,
}

impl MultiField {
    /// Uses every prime in `minimum..=maximum`.
    pub fn new(minimum: u64, maximum: u64) -> Result<Self, PersmatError> {
        if maximum < 2 {
            return Err(PersmatError::InvalidConfiguration(
                "characteristic must be at least 2".to_owned(),
            ));
        }
        if minimum > maximum {
            return Err(PersmatError::InvalidConfiguration(format!(
                "the interval [{minimum}, {maximum}] is not valid"
            )));
        }

        let mut primes = Vec::new();
        let mut product: u64 = 1;
        for candidate in minimum..=maximum {
            if !is_prime(candidate) {
                continue;
            }
            product = product.checked_mul(candidate).ok_or_else(|| {
                PersmatError::InvalidConfiguration(format!(
                    "the product of the primes in [{minimum}, {maximum}] does not fit in 64 bits"
                ))
            })?;
            primes.push(candidate);
        }

        if primes.is_empty() {
            return Err(PersmatError::InvalidConfiguration(format!(
                "the interval [{minimum}, {maximum}] does not contain a prime"
            )));
        }

        let partials = primes
            .iter()
            .map(|&p| pow_mod(product / p, p - 1, product))
            .collect();

        log::debug!("multi-field over primes {primes:?}, modulus {product}");

        Ok(Self {
            primes,
            product,
            partials,
        })
    }

    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    /// The CRT idempotents `e_i`, in the order of [`primes`](Self::primes).
    pub fn partials(&self) -> &[u64] {
        &self.partials
    }

    /// Sum of the idempotents of the primes dividing `product_of_characteristics`;
    /// this is `1` on exactly those components and `0` elsewhere.
    pub fn partial_multiplicative_identity(&self, product_of_characteristics: u64) -> u64 {
        if product_of_characteristics % self.product == 0 {
            return 1;
        }
        self.primes
            .iter()
            .zip(&self.partials)
            .filter(|(p, _)| product_of_characteristics % **p == 0)
            .fold(0, |acc, (_, e)| add_mod(acc, *e, self.product))
    }

    /// Inverts `value` only on the components of `product_of_characteristics` where it is non-zero.
    ///
    /// Returns `(inverse, qt)` where `qt` is the product of those components' primes, so that
    /// `value * inverse` is the partial identity of `qt`.
    /// If `value` vanishes on every component of `product_of_characteristics` the result is `(0, 1)`,
    /// as it is for an empty product `0`.
    pub fn partial_inverse(&self, value: u64, product_of_characteristics: u64) -> (u64, u64) {
        if product_of_characteristics == 0 {
            return (0, 1);
        }
        let value = value % self.product;
        let qt = product_of_characteristics / value.gcd(&product_of_characteristics);
        if qt <= 1 {
            return (0, 1);
        }
        let identity = self.partial_multiplicative_identity(qt);
        let Some(inverse) = inverse_mod(value % qt, qt) else {
            log::warn!("{product_of_characteristics} is not a product of distinct primes of the field");
            return (0, 1);
        };
        (mul_mod(identity, inverse % self.product, self.product), qt)
    }
}

impl ModularRing for MultiField {
    fn modulus(&self) -> u64 {
        self.product
    }
}

// ======== Coefficients for Z/p and multi-fields ==============

macro_rules! impl_modular_operators {
    ($ring:ident) => {
        impl FieldOperators for $ring {
            type Coeff = NonZeroU64;

            fn characteristic(&self) -> u64 {
                self.modulus()
            }

            fn one(&self) -> Self::Coeff {
                NonZeroU64::MIN
            }

            fn coefficient(&self, value: u64) -> Option<Self::Coeff> {
                NonZeroU64::new(value % self.modulus())
            }

            fn value(&self, coeff: Self::Coeff) -> u64 {
                coeff.get()
            }

            fn add(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff> {
                NonZeroU64::new(add_mod(a.get(), b.get(), self.modulus()))
            }

            fn multiply(&self, a: Self::Coeff, b: Self::Coeff) -> Option<Self::Coeff> {
                NonZeroU64::new(mul_mod(a.get(), b.get(), self.modulus()))
            }

            fn additive_inverse(&self, a: Self::Coeff) -> Self::Coeff {
                NonZeroU64::new(self.modulus() - a.get())
                    .expect("Coefficients are reduced below the modulus")
            }

            fn inverse(&self, a: Self::Coeff) -> Option<Self::Coeff> {
                inverse_mod(a.get(), self.modulus()).and_then(NonZeroU64::new)
            }
        }
    };
}

impl_modular_operators!(PrimeField);
impl_modular_operators!(MultiField);

// ======== Standalone elements ================================

/// A value of a [`ModularRing`], tied to the ring it lives in.
pub struct FieldElement<'r, R: ModularRing> {
    value: u64,
    ring: &'r R,
}

impl<'r, R: ModularRing> Clone for FieldElement<'r, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'r, R: ModularRing> Copy for FieldElement<'r, R> {}

impl<'r, R: ModularRing> Debug for FieldElement<'r, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (mod {})", self.value, self.ring.modulus())
    }
}

impl<'r, R: ModularRing> PartialEq for FieldElement<'r, R> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.ring.modulus() == other.ring.modulus()
    }
}

impl<'r, R: ModularRing> Eq for FieldElement<'r, R> {}

impl<'r, R: ModularRing> PartialEq<u64> for FieldElement<'r, R> {
    fn eq(&self, other: &u64) -> bool {
        self.value == other % self.ring.modulus()
    }
}

impl<'r, R: ModularRing> FieldElement<'r, R> {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    fn with_value(self, value: u64) -> Self {
        Self {
            value,
            ring: self.ring,
        }
    }

    /// [`None`] when the element is not a unit.
    pub fn inverse(self) -> Option<Self> {
        inverse_mod(self.value, self.ring.modulus()).map(|value| self.with_value(value))
    }
}

impl<'r> FieldElement<'r, MultiField> {
    /// See [`MultiField::partial_inverse`].
    pub fn partial_inverse(self, product_of_characteristics: u64) -> (Self, u64) {
        let (value, qt) = self
            .ring
            .partial_inverse(self.value, product_of_characteristics);
        (self.with_value(value), qt)
    }

    /// The partial identity for the components where this element vanishes.
    pub fn partial_multiplicative_identity(self) -> Self {
        if self.value == 0 {
            return self.with_value(1);
        }
        let value = self
            .ring
            .primes
            .iter()
            .zip(&self.ring.partials)
            .filter(|(p, _)| self.value % **p == 0)
            .fold(0, |acc, (_, e)| add_mod(acc, *e, self.ring.product));
        self.with_value(value)
    }
}

impl<'r, R: ModularRing> Add for FieldElement<'r, R> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.with_value(add_mod(self.value, rhs.value, self.ring.modulus()))
    }
}

impl<'r, R: ModularRing> Sub for FieldElement<'r, R> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.with_value(sub_mod(self.value, rhs.value, self.ring.modulus()))
    }
}

impl<'r, R: ModularRing> Mul for FieldElement<'r, R> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.with_value(mul_mod(self.value, rhs.value, self.ring.modulus()))
    }
}

impl<'r, R: ModularRing> Neg for FieldElement<'r, R> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.with_value(sub_mod(0, self.value, self.ring.modulus()))
    }
}

#[cfg(test)]
mod tests {

    use std::num::NonZeroU64;

    use super::*;

    #[test]
    fn test_add_mod_2() {
        assert_eq!(Z2 + Z2, None);
        assert_eq!(Z2 + None, Some(Z2));
        assert_eq!(FieldOperators::add(&Z2, Z2, Z2), None);
        assert_eq!(Z2.add_option(Z2, None), Some(Z2));
    }

    #[test]
    fn test_prod_mod_2() {
        assert_eq!(Z2 * Z2, Z2);
        assert_eq!(Z2.coefficient(4), None);
        assert_eq!(Z2.signed_coefficient(-3), Some(Z2));
    }

    #[test]
    fn test_add_mod_3() {
        let z3 = PrimeField::new(3).unwrap();
        let one = z3.one();
        let two = z3.add(one, one);
        assert_eq!(two, NonZeroU64::new(2));
        assert_eq!(z3.add(one, two.unwrap()), None);
    }

    #[test]
    fn test_prod_mod_3() {
        let z3 = PrimeField::new(3).unwrap();
        let two = z3.coefficient(2).unwrap();
        let one = z3.one();
        assert_eq!(z3.multiply(two, one), Some(two));
        assert_eq!(z3.multiply(one, two), Some(two));
        assert_eq!(z3.multiply(two, two), Some(one));
        assert_eq!(z3.multiply(one, one), Some(one));
    }

    #[test]
    fn test_inverses_mod_5() {
        let z5 = PrimeField::new(5).unwrap();
        for value in 1..5 {
            let a = z5.coefficient(value).unwrap();
            let inverse = z5.inverse(a).unwrap();
            assert_eq!(z5.multiply(a, inverse), Some(z5.one()));
            assert_eq!(z5.add(a, z5.additive_inverse(a)), None);
        }
        assert_eq!(z5.signed_coefficient(-1), z5.coefficient(4));
        assert_eq!(z5.subtract(z5.one(), z5.one()), None);
    }

    #[test]
    fn test_prime_field_rejects_composites() {
        assert!(PrimeField::new(4).is_err());
        assert!(PrimeField::new(1).is_err());
        assert!(PrimeField::new(7919).is_ok());
    }

    #[test]
    fn test_mul_mod_does_not_overflow() {
        // 2^64 - 59 is the largest prime below 2^64
        let m = u64::MAX - 58;
        assert_eq!(mul_mod(m - 1, m - 1, m), 1);
        assert_eq!(mul_mod(m - 1, 2, m), m - 2);
        assert_eq!(pow_mod(m - 1, 3, m), m - 1);
        assert_eq!(add_mod(m - 1, m - 1, m), m - 2);
        assert_eq!(inverse_mod(m - 1, m), Some(m - 1));
    }

    #[test]
    fn test_multi_field_configuration_errors() {
        assert!(matches!(
            MultiField::new(0, 1),
            Err(PersmatError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            MultiField::new(5, 3),
            Err(PersmatError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            MultiField::new(24, 28),
            Err(PersmatError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            MultiField::new(4, 4),
            Err(PersmatError::InvalidConfiguration(_))
        ));
        // Product of the first 16 primes overflows 64 bits
        assert!(matches!(
            MultiField::new(2, 60),
            Err(PersmatError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_multi_field_crt_basis() {
        let field = MultiField::new(2, 3).unwrap();
        assert_eq!(field.primes(), &[2, 3]);
        assert_eq!(field.characteristic(), 6);
        assert_eq!(field.partials(), &[3, 4]);

        let field = MultiField::new(2, 7).unwrap();
        assert_eq!(field.characteristic(), 210);
        for (&p, &e) in field.primes().iter().zip(field.partials()) {
            assert_eq!(e % p, 1);
            for &q in field.primes().iter().filter(|&&q| q != p) {
                assert_eq!(e % q, 0);
            }
        }
        assert_eq!(field.partial_multiplicative_identity(210), 1);
    }

    #[test]
    fn test_multi_field_arithmetic() {
        let field = MultiField::new(2, 3).unwrap();
        let five = field.element(5);
        let four = field.element(4);
        assert_eq!(five + four, 3);
        assert_eq!(five - four, 1);
        assert_eq!(four - five, 5);
        assert_eq!(five * four, 2);
        assert_eq!(-five, 1);
        assert_eq!(field.signed_element(-1), five);
        assert_eq!(field.element(13), 1);
        assert_eq!(field.additive_identity() + five, five);
        assert_eq!(field.multiplicative_identity() * five, five);
    }

    #[test]
    fn test_multi_field_partial_inverse() {
        let field = MultiField::new(2, 3).unwrap();
        let five = field.element(5);

        // Inverting only the mod 2 component yields the idempotent e_2 = 3
        let (partial, qt) = five.partial_inverse(2);
        assert_eq!(partial, 3);
        assert_eq!(qt, 2);
        assert_eq!(five * partial, 3);
        assert_eq!(partial.value() % 2, 1);
        assert_eq!(partial.value() % 3, 0);

        // Inverting on every component is the ordinary inverse
        let (full, qt) = five.partial_inverse(6);
        assert_eq!(qt, 6);
        assert_eq!(full, five.inverse().unwrap());
        assert_eq!(five * full, 1);

        // 3 vanishes modulo 3 so it cannot be inverted there
        let three = field.element(3);
        assert_eq!(three.partial_inverse(3), (field.element(0), 1));
        assert_eq!(three.inverse(), None);
        assert_eq!(three.partial_multiplicative_identity(), 4);
        assert_eq!(field.element(0).partial_inverse(6), (field.element(0), 1));

        // An empty product of characteristics inverts nothing
        assert_eq!(field.partial_inverse(0, 0), (0, 1));
        assert_eq!(field.partial_inverse(5, 0), (0, 1));
    }

    #[test]
    fn test_multi_field_coefficients_have_zero_divisors() {
        let field = MultiField::new(2, 3).unwrap();
        let two = field.coefficient(2).unwrap();
        let three = field.coefficient(3).unwrap();
        assert_eq!(field.multiply(two, three), None);
        assert_eq!(field.inverse(two), None);
        assert_eq!(field.inverse(field.coefficient(5).unwrap()), field.coefficient(5));
    }
}
