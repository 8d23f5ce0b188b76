#![no_main]

use arbitrary::Arbitrary;
use declet_template::{Tagged, unpack_tags};
use declet_tree::{DeclarativeRef, Element};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    tags: Vec<u8>,
    startag: Option<u8>,
    items: u8,
}

fuzz_target!(|input: Input| {
    let tags: Vec<String> = input.tags.iter().take(16).map(|t| format!("t{}", t % 8)).collect();
    let startag = input.startag.map(|s| format!("t{}", s % 8)).unwrap_or_default();
    let items: Vec<DeclarativeRef> = (0..input.items % 32)
        .map(|i| Element::new(format!("i{i}")) as DeclarativeRef)
        .collect();

    if let Ok(tagged) = unpack_tags(&tags, &startag, &items) {
        assert!(tagged.len() <= tags.len() + 1);
        for value in tagged.values() {
            match value {
                Tagged::Item(item) => assert!(items.iter().any(|i| i.same_node(&**item))),
                Tagged::Rest(rest) => assert!(rest.len() <= items.len()),
            }
        }
    }
});
