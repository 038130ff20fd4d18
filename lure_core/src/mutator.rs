use crate::input::Input;
use rand::Rng;

/// Derives a new input from an existing one.
pub trait Mutator<I: Input, R: Rng + ?Sized> {
    /// Mutates `input`, or generates a fresh input when there is none.
    fn mutate(&mut self, input: Option<&I>, rng: &mut R) -> I;
}

/// Adds a small random value to one randomly chosen byte.
///
/// Empty and missing inputs become a single byte first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlipSingleByteMutator;

impl<I, R> Mutator<I, R> for FlipSingleByteMutator
where
    I: Input + From<Vec<u8>>,
    R: Rng + ?Sized,
{
    fn mutate(&mut self, input: Option<&I>, rng: &mut R) -> I {
        let mut bytes = input.map_or_else(Vec::new, |input| input.as_bytes().to_vec());
        if bytes.is_empty() {
            bytes.push(0);
        }

        let delta = rng.random_range(1u8..=15u8);
        let index = rng.random_range(0..bytes.len());
        bytes[index] = bytes[index].wrapping_add(delta);

        I::from(bytes)
    }
}
