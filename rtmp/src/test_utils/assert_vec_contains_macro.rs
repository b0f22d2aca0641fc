/// Panics unless at least one element of the vector matches the pattern.  The `=> expr` form runs
/// `expr` for every matching element, which allows pulling values out of the match.
macro_rules! assert_vec_contains {
    (@match $vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        let mut has_value = false;
        for x in $vector.iter() {
            match x {
                $pattern if $cond => {
                    has_value = true;
                    $success
                }
                _ => (),
            };
        }

        if !has_value {
            panic!(
                "None of the {} elements matched '{} if {}': {:?}",
                $vector.len(),
                stringify!($pattern),
                stringify!($cond),
                $vector
            )
        }
    };

    ($vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => $success);
    };

    ($vector:expr, $pattern:pat => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if true => $success);
    };

    ($vector:expr, $pattern:pat if $cond:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => ());
    };

    ($vector:expr, $pattern:pat) => {
        assert_vec_contains!(@match $vector, $pattern if true => ());
    };
}

/// Panics unless the vector contains no element matching the pattern
macro_rules! assert_vec_lacks {
    ($vector:expr, $pattern:pat) => {
        for x in $vector.iter() {
            if let $pattern = x {
                panic!("Unexpected element matching '{}': {:?}", stringify!($pattern), x);
            }
        }
    };
}
