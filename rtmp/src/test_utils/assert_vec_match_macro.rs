/// Matches each element of the vector against the patterns in order, panicking on the first
/// mismatch or if the lengths differ.  With no patterns the vector must be empty.  A pattern may
/// be followed by `=> { ... }` to run further assertions against its bindings.
macro_rules! assert_vec_match {
    (@check $idx:expr, $vector:expr, $pattern:pat $(if $cond:expr)? $(=> $body:block)?) => {
        match $vector.get($idx) {
            Some($pattern) $(if $cond)? => { $($body)? }
            other => panic!(
                "Element {} did not match '{}': {:?}",
                $idx,
                stringify!($pattern),
                other
            ),
        }
    };

    ($vector:expr, $($pattern:pat $(if $cond:expr)? $(=> $body:block)?),+ $(,)?) => {{
        let mut idx = 0_usize;
        $(
            assert_vec_match!(@check idx, $vector, $pattern $(if $cond)? $(=> $body)?);
            idx += 1;
        )+

        assert_eq!($vector.len(), idx, "Vector had unexpected trailing elements: {:?}", $vector);
    }};

    ($vector:expr) => {
        assert!($vector.is_empty(), "Expected an empty vector but got: {:?}", $vector);
    };
}
