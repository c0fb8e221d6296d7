extern crate string_cache_codegen;

use std::env;
use std::fs::File;
use std::path::Path;

fn main() {
    // Qualifiers that either drive gene recognition or commonly end up as
    // table columns. Anything else is interned dynamically.
    let qualifiers = [
        "collected_by",
        "collection_date",
        "country",
        "db_xref",
        "gene",
        "gene_synonym",
        "isolate",
        "isolation_source",
        "lat_lon",
        "locus_tag",
        "mol_type",
        "note",
        "organelle",
        "organism",
        "product",
        "protein_id",
        "pseudo",
        "specimen_voucher",
        "strain",
        "translation",
        "transl_table",
    ];
    let feature_kinds = [
        "CDS",
        "exon",
        "gene",
        "misc_feature",
        "mRNA",
        "rRNA",
        "source",
        "tRNA",
    ];
    let file = File::create(Path::new(&env::var("OUT_DIR").unwrap()).join("atoms.rs")).unwrap();
    string_cache_codegen::AtomType::new("QualifierKey", "qualifier_key!")
        .atoms(qualifiers.iter())
        .write_to(&file)
        .unwrap();
    string_cache_codegen::AtomType::new("FeatureKind", "feature_kind!")
        .atoms(feature_kinds.iter())
        .write_to(&file)
        .unwrap();
}
