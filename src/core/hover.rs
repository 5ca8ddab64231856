/// Whether a bubbling `pointerover` is a fresh entry into a hover target.
///
/// `over` is the hover target enclosing the event target, `from` the one
/// enclosing the element the pointer came from. Moving between children of
/// the same target is not an entry.
pub fn is_hover_entry<T: PartialEq>(over: Option<&T>, from: Option<&T>) -> bool {
    match (over, from) {
        (None, _) => false,
        (Some(o), Some(f)) => o != f,
        (Some(_), None) => true,
    }
}
