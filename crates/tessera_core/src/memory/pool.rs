//! # Object Pool
//!
//! Free-list pool for objects that are acquired and recycled many times per
//! tick, such as the scratch buffers used by structural world operations.

/// A pool of reusable objects.
///
/// Objects are created on demand by the `create` function and handed back
/// with [`recycle`](Self::recycle), which runs `reset` before storing them.
/// A recycled object keeps whatever heap allocation it owns, so a warmed-up
/// pool performs no allocations.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Example
///
/// ```rust
/// use tessera_core::ObjectPool;
///
/// let mut pool: ObjectPool<Vec<u32>> = ObjectPool::new(Vec::new, Vec::clear);
///
/// let mut buffer = pool.acquire();
/// buffer.extend([1, 2, 3]);
/// pool.recycle(buffer);
///
/// // Same allocation, cleared.
/// assert!(pool.acquire().is_empty());
/// ```
pub struct ObjectPool<T> {
    /// Objects ready to be handed out.
    free: Vec<T>,
    /// Builds a fresh object when the free list runs dry.
    create: fn() -> T,
    /// Brings a returned object back to a neutral state.
    reset: fn(&mut T),
    /// Total objects ever created by this pool.
    created: usize,
}

/// Minimum number of objects created when the pool grows.
const MIN_GROWTH: usize = 5;

impl<T> ObjectPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(create: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            free: Vec::new(),
            create,
            reset,
            created: 0,
        }
    }

    /// Creates a pool with `capacity` objects already created.
    #[must_use]
    pub fn with_capacity(capacity: usize, create: fn() -> T, reset: fn(&mut T)) -> Self {
        let mut pool = Self::new(create, reset);
        pool.grow(capacity);
        pool
    }

    /// Returns the number of objects ready to be acquired.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Returns the total number of objects created by this pool.
    #[inline]
    #[must_use]
    pub const fn created(&self) -> usize {
        self.created
    }

    /// Returns the number of objects currently handed out.
    ///
    /// Objects dropped by their holder instead of being recycled still count.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.created - self.free.len()
    }

    /// Takes an object from the pool, growing it if no object is free.
    ///
    /// The pool grows by the number of objects it has created so far
    /// (at least 5), doubling its size each time it runs dry.
    pub fn acquire(&mut self) -> T {
        if self.free.is_empty() {
            self.grow(self.created.max(MIN_GROWTH));
        }
        match self.free.pop() {
            Some(object) => object,
            None => (self.create)(),
        }
    }

    /// Takes an object and prepares it with `setup`.
    pub fn acquire_with(&mut self, setup: impl FnOnce(&mut T)) -> T {
        let mut object = self.acquire();
        setup(&mut object);
        object
    }

    /// Resets an object and returns it to the pool.
    pub fn recycle(&mut self, mut object: T) {
        (self.reset)(&mut object);
        self.free.push(object);
    }

    /// Drops every free object.
    ///
    /// Objects currently handed out are unaffected and may still be recycled.
    pub fn clear(&mut self) {
        self.created -= self.free.len();
        self.free.clear();
    }

    fn grow(&mut self, count: usize) {
        self.free.reserve(count);
        for _ in 0..count {
            self.free.push((self.create)());
        }
        self.created += count;
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.available())
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}
