//! Parses a line-notation chemical identifier, regenerates it from the atom
//! graph and parses the regenerated form again.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use purr::graph::Builder;
use purr::read::read;
use purr::walk::walk;
use purr::write::Writer;

/// Atoms in the graph plus the identifier regenerated from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regenerated {
    pub atoms: usize,
    pub identifier: String,
    pub reparsed: bool,
}

fn parse(identifier: &str) -> Option<Vec<purr::graph::Atom>> {
    let mut builder = Builder::new();
    discard(
        "smiles read",
        read(identifier, &mut builder, None).map_err(|e| format!("{e:?}")),
    )?;
    discard("smiles build", builder.build().map_err(|e| format!("{e:?}")))
}

/// Parses `identifier`, writes it back out from the atom graph, then checks
/// that the output parses too.
pub fn regenerate(identifier: &str) -> Option<Regenerated> {
    let atoms = parse(identifier)?;
    let count = atoms.len();

    let mut writer = Writer::new();
    walk(atoms, &mut writer).ok()?;
    let regenerated = writer.write();
    let reparsed = parse(&regenerated).is_some();

    Some(Regenerated {
        atoms: count,
        identifier: regenerated,
        reparsed,
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChemIdentifierHarness;

impl Harness for ChemIdentifierHarness {
    fn name(&self) -> &'static str {
        "chem-identifier"
    }

    fn min_len(&self) -> usize {
        1
    }

    fn exercise(&self, data: &[u8], _ctx: &HarnessContext) -> Outcome {
        let Ok(text) = std::str::from_utf8(data) else {
            return Outcome::Rejected;
        };
        let _ = regenerate(text);
        Outcome::Exercised
    }
}
