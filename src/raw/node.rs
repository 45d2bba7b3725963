use super::handle::Handle;

/// One level of one column.
///
/// Every node of a column refers to the same payload slot; sentinels carry no
/// payload and are the only nodes without a `prev` link.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Node {
    pub(crate) payload: Option<Handle>,
    pub(crate) next: Option<Handle>,
    pub(crate) prev: Option<Handle>,
    pub(crate) up: Option<Handle>,
    pub(crate) down: Option<Handle>,
}

impl Node {
    /// Creates the sentinel heading a new level stacked on top of `down`.
    #[inline]
    pub(crate) const fn sentinel(down: Option<Handle>) -> Self {
        Self {
            payload: None,
            next: None,
            prev: None,
            up: None,
            down,
        }
    }

    /// Creates a column node linked between `prev` and `next`.
    ///
    /// Only the node's own links are set; the neighbours still have to be pointed at it.
    #[inline]
    pub(crate) const fn linked(payload: Handle, prev: Handle, next: Option<Handle>, down: Option<Handle>) -> Self {
        Self {
            payload: Some(payload),
            next,
            prev: Some(prev),
            up: None,
            down,
        }
    }

    #[inline]
    pub(crate) const fn is_sentinel(&self) -> bool {
        self.prev.is_none()
    }
}
