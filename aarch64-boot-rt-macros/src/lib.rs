//! Macros for the aarch64-boot-rt library
//!
//! Provides the `#[entry]` attribute macro.
//!
//! Do not use this crate directly.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse, parse_macro_input, spanned::Spanned, AttrStyle, Attribute, Ident, ItemFn, ReturnType,
    Type, Visibility,
};

/// Attributes that may stay on an entry point
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "doc",
    "link_section",
    "cfg",
    "allow",
    "warn",
    "deny",
    "forbid",
    "cold",
    "expect",
];

/// Creates an `unsafe` kernel entry point (i.e. a `kmain` function).
///
/// It's `unsafe` because you are not supposed to call it - the start-up code
/// calls it once, at EL1 with translation on.
///
/// When placed on a function like:
///
/// ```rust ignore
/// #[entry]
/// fn foo() -> ! {
///     panic!("On no")
/// }
/// ```
///
/// You get something like:
///
/// ```rust
/// #[doc(hidden)]
/// #[export_name = "kmain"]
/// pub unsafe extern "C" fn __aarch64_boot_rt_kmain() -> ! {
///     foo()
/// }
///
/// fn foo() -> ! {
///     panic!("On no")
/// }
/// ```
#[proc_macro_attribute]
pub fn entry(args: TokenStream, input: TokenStream) -> TokenStream {
    let f = parse_macro_input!(input as ItemFn);

    if !args.is_empty() {
        return parse::Error::new(Span::call_site(), "This attribute accepts no arguments")
            .to_compile_error()
            .into();
    }

    if let Err(error) = check_signature(&f) {
        return error.to_compile_error().into();
    }

    if let Err(error) = check_attributes(&f.attrs) {
        return error.to_compile_error().into();
    }

    let tramp_ident = Ident::new("__aarch64_boot_rt_kmain", Span::call_site());
    let ident = &f.sig.ident;
    let call = if f.sig.unsafety.is_some() {
        quote!(unsafe { #ident() })
    } else {
        quote!(#ident())
    };
    let (cfgs, attrs) = split_cfgs(f.attrs.clone());

    quote!(
        #(#cfgs)*
        #(#attrs)*
        #[doc(hidden)]
        #[export_name = "kmain"]
        pub unsafe extern "C" fn #tramp_ident() -> ! {
            #call
        }

        #f
    )
    .into()
}

/// The function must be `[unsafe] fn name() -> !`
fn check_signature(f: &ItemFn) -> Result<(), parse::Error> {
    let sig = &f.sig;
    let diverges = match sig.output {
        ReturnType::Default => false,
        ReturnType::Type(_, ref ty) => matches!(**ty, Type::Never(_)),
    };
    let valid = sig.constness.is_none()
        && sig.asyncness.is_none()
        && f.vis == Visibility::Inherited
        && sig.abi.is_none()
        && sig.inputs.is_empty()
        && sig.generics.params.is_empty()
        && sig.generics.where_clause.is_none()
        && sig.variadic.is_none()
        && diverges;
    if valid {
        Ok(())
    } else {
        Err(parse::Error::new(
            f.span(),
            "`#[entry]` function must have signature `[unsafe] fn() -> !`",
        ))
    }
}

/// Reject anything not in [`ALLOWED_ATTRIBUTES`]
fn check_attributes(attrs: &[Attribute]) -> Result<(), parse::Error> {
    match attrs
        .iter()
        .find(|attr| !ALLOWED_ATTRIBUTES.iter().any(|name| is_outer(attr, name)))
    {
        Some(attr) => Err(parse::Error::new(
            attr.span(),
            "this attribute is not allowed on an aarch64-boot-rt entry point",
        )),
        None => Ok(()),
    }
}

/// Split attributes into `(cfgs, everything_else)`
fn split_cfgs(attrs: Vec<Attribute>) -> (Vec<Attribute>, Vec<Attribute>) {
    attrs.into_iter().partition(|attr| is_outer(attr, "cfg"))
}

/// Returns `true` if `attr` is an outer attribute called `name`
fn is_outer(attr: &Attribute, name: &str) -> bool {
    attr.style == AttrStyle::Outer && attr.path().is_ident(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(src: &str) -> ItemFn {
        syn::parse_str(src).unwrap()
    }

    #[test]
    fn accepts_diverging_functions() {
        assert!(check_signature(&item("fn main() -> ! { loop {} }")).is_ok());
        assert!(check_signature(&item("unsafe fn main() -> ! { loop {} }")).is_ok());
    }

    #[test]
    fn rejects_other_signatures() {
        for src in [
            "fn main() { }",
            "fn main() -> u32 { 0 }",
            "pub fn main() -> ! { loop {} }",
            "fn main(x: u32) -> ! { loop {} }",
            "extern \"C\" fn main() -> ! { loop {} }",
            "const fn main() -> ! { loop {} }",
            "async fn main() -> ! { loop {} }",
            "fn main<T>() -> ! { loop {} }",
        ] {
            assert!(check_signature(&item(src)).is_err(), "{}", src);
        }
    }

    #[test]
    fn attribute_filter() {
        let f = item("#[cfg(feature = \"x\")] #[doc = \"hi\"] #[inline] fn main() -> ! { loop {} }");
        assert!(check_attributes(&f.attrs).is_err());
        assert!(check_attributes(&f.attrs[..2]).is_ok());

        let (cfgs, rest) = split_cfgs(f.attrs.clone());
        assert_eq!(cfgs.len(), 1);
        assert_eq!(rest.len(), 2);
        assert!(is_outer(&cfgs[0], "cfg"));
    }
}
