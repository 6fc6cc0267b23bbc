use std::any::Any;

/// A component column implemented outside the kernel.
///
/// The table calls `allocate_table` once at registration and
/// `expand_table` whenever entity capacity grows; values move in and out
/// as `Any` so the implementor picks its own storage layout.
pub trait CustomComponent: Send + Sync {
    fn name(&self) -> &str;

    fn allocate_table(&mut self, capacity: usize);

    fn expand_table(&mut self, n: usize);

    /// Store `value` at slot `id`. Returns false if the value has the wrong type.
    fn set(&mut self, id: usize, value: Box<dyn Any + Send>) -> bool;

    fn get(&self, id: usize) -> Option<&dyn Any>;
}
