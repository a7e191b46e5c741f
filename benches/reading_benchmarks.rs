use criterion::{Criterion, black_box, criterion_group, criterion_main};

use lexiread::engine::highlight::resolve_highlight;
use lexiread::engine::progress_index::{ProgressIndex, ProgressRecord};
use lexiread::text::tokenize;
use lexiread::ui::components::reading_area::PageLayout;

const WORDS: [&str; 12] = [
    "der", "Baum", "steht", "im", "Garten", "und", "wirft", "lange", "Schatten", "über",
    "das", "Haus's",
];

fn make_page(word_count: usize) -> String {
    let mut page = String::new();
    for i in 0..word_count {
        page.push_str(WORDS[i % WORDS.len()]);
        page.push_str(match i % 17 {
            16 => ".\n",
            8 => ", ",
            _ => " ",
        });
    }
    page
}

fn make_index(size: usize) -> ProgressIndex {
    ProgressIndex::from_records((0..size).map(|i| ProgressRecord {
        id: i as u64,
        word: format!("{}{i}", WORDS[i % WORDS.len()]),
        progress: (i % 11) as u8,
        highlight_disabled: i % 13 == 0,
        count: 1,
        translation: String::new(),
    }))
}

fn bench_tokenize(c: &mut Criterion) {
    let page = make_page(600);

    c.bench_function("tokenize (600 words)", |b| {
        b.iter(|| tokenize(black_box(&page)))
    });
}

fn bench_layout(c: &mut Criterion) {
    let page = make_page(600);
    let tokens = tokenize(&page);

    c.bench_function("page layout (600 words, 78 cols)", |b| {
        b.iter(|| PageLayout::build(black_box(&tokens), 78))
    });
}

fn bench_highlight(c: &mut Criterion) {
    let page = make_page(600);
    let tokens = tokenize(&page);
    let mut index = make_index(5000);
    for (i, word) in WORDS.iter().enumerate() {
        index.upsert(ProgressRecord {
            id: 10_000 + i as u64,
            word: word.to_string(),
            progress: (i % 11) as u8,
            highlight_disabled: false,
            count: 1,
            translation: String::new(),
        });
    }

    c.bench_function("resolve highlights (600 words, 5k index)", |b| {
        b.iter(|| {
            tokens
                .iter()
                .filter(|t| t.is_word())
                .filter_map(|t| resolve_highlight(black_box(t.text), &index))
                .count()
        })
    });
}

criterion_group!(benches, bench_tokenize, bench_layout, bench_highlight);
criterion_main!(benches);
