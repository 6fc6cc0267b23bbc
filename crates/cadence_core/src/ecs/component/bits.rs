use std::fmt;

const WORD_BITS: usize = 64;

/// Component membership bits, one per registered component name.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ComponentBitSet {
    words: Vec<u64>,
    width: usize,
}

impl ComponentBitSet {
    pub fn new(width: usize) -> Self {
        Self {
            words: vec![0; width.div_ceil(WORD_BITS)],
            width,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    fn grow_to(&mut self, width: usize) {
        if width > self.width {
            self.width = width;
            self.words.resize(width.div_ceil(WORD_BITS), 0);
        }
    }

    /// Set `bit`, widening the set if it lies past the current width.
    pub fn set(&mut self, bit: usize) {
        self.grow_to(bit + 1);
        self.words[bit / WORD_BITS] |= 1u64 << (bit % WORD_BITS);
    }

    pub fn clear(&mut self, bit: usize) {
        if let Some(word) = self.words.get_mut(bit / WORD_BITS) {
            *word &= !(1u64 << (bit % WORD_BITS));
        }
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        self.words
            .get(bit / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (bit % WORD_BITS)) != 0)
    }

    /// Whether every bit set in `other` is also set here.
    pub fn contains_all(&self, other: &ComponentBitSet) -> bool {
        other.words.iter().enumerate().all(|(i, &theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            ours & theirs == theirs
        })
    }

    pub fn union_with(&mut self, other: &ComponentBitSet) {
        self.grow_to(other.width);
        for (ours, theirs) in self.words.iter_mut().zip(&other.words) {
            *ours |= theirs;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.width).filter(|&bit| self.get(bit))
    }
}

impl fmt::Debug for ComponentBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = (0..self.width)
            .map(|bit| if self.get(bit) { '1' } else { '0' })
            .collect();
        write!(f, "ComponentBitSet({bits})")
    }
}
