use std::fmt;
use std::ops::Index;
use std::sync::OnceLock;

type Supplier<'a, T> = Box<dyn Fn() -> T + Send + Sync + 'a>;

/// Read-only list whose content is computed on first access and cached.
///
/// Emptiness may be answered by a separate, cheaper check that never forces
/// the content. Both suppliers run at most once.
pub struct LazyList<'a, T> {
    content: OnceLock<Vec<T>>,
    empty: OnceLock<bool>,
    compute: Supplier<'a, Vec<T>>,
    check_empty: Option<Supplier<'a, bool>>,
}

impl<'a, T> LazyList<'a, T> {
    /// `check_empty` must agree with `compute().is_empty()`.
    pub fn new(
        compute: impl Fn() -> Vec<T> + Send + Sync + 'a,
        check_empty: impl Fn() -> bool + Send + Sync + 'a,
    ) -> Self {
        Self {
            content: OnceLock::new(),
            empty: OnceLock::new(),
            compute: Box::new(compute),
            check_empty: Some(Box::new(check_empty)),
        }
    }

    /// A list with no shortcut: asking for emptiness forces the content.
    pub fn deferred(compute: impl Fn() -> Vec<T> + Send + Sync + 'a) -> Self {
        Self {
            content: OnceLock::new(),
            empty: OnceLock::new(),
            compute: Box::new(compute),
            check_empty: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self.empty.get_or_init(|| match (&self.check_empty, self.content.get()) {
            (_, Some(content)) => content.is_empty(),
            (Some(check), None) => check(),
            (None, None) => self.as_slice().is_empty(),
        })
    }

    /// Whether the content has been computed yet.
    pub fn is_materialized(&self) -> bool {
        self.content.get().is_some()
    }

    pub fn as_slice(&self) -> &[T] {
        self.content.get_or_init(|| (self.compute)())
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Sub-range `[from, to)`; `None` when out of bounds.
    pub fn sub_list(&self, from: usize, to: usize) -> Option<&[T]> {
        self.as_slice().get(from..to)
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(item)
    }

    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.as_slice().iter().position(predicate)
    }
}

impl<T> Index<usize> for LazyList<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<'l, T> IntoIterator for &'l LazyList<'_, T> {
    type Item = &'l T;
    type IntoIter = std::slice::Iter<'l, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.content.get() {
            Some(content) => f.debug_list().entries(content).finish(),
            None => f.write_str("LazyList(<pending>)"),
        }
    }
}
