#[macro_use]
extern crate bencher;

use bencher::Bencher;
use gb_harvest::config::{FeatureTypeList, RecognitionList};
use gb_harvest::reader::{parse_slice, RecordReader};
use gb_harvest::resolve::resolve;

const COI: &[u8] = include_bytes!("../tests/data/coi.gb");

// roughly the size of one 300 record efetch response
fn chunk_response() -> Vec<u8> {
    COI.repeat(100)
}

fn chunk_slice(b: &mut Bencher) {
    let data = chunk_response();
    b.bytes = data.len() as u64;
    b.iter(|| parse_slice(&data).unwrap());
}

fn chunk_streaming(b: &mut Bencher) {
    let data = chunk_response();
    b.iter(|| RecordReader::new(&data[..]).next().unwrap().unwrap());
}

fn chunk_resolve(b: &mut Bencher) {
    let records = parse_slice(&chunk_response()).unwrap();
    let recognition = RecognitionList::default();
    let types = FeatureTypeList::default();
    b.iter(|| {
        records
            .iter()
            .map(|r| resolve(r, &recognition, &types))
            .count()
    });
}

benchmark_group!(benches, chunk_slice, chunk_streaming, chunk_resolve);
benchmark_main!(benches);
