use criterion::{black_box, criterion_group, criterion_main, Criterion};
use treebank_conllu::{parse_corpus, write_corpus};

const SENTENCE: &str = "# sent_id = bench\n\
# text = Le petit chat dort sur le tapis du salon.\n\
1\tLe\tle\tDET\t_\tDefinite=Def|Gender=Masc|Number=Sing\t3\tdet\t3:det\t_\n\
2\tpetit\tpetit\tADJ\t_\tGender=Masc|Number=Sing\t3\tamod\t3:amod\t_\n\
3\tchat\tchat\tNOUN\t_\tGender=Masc|Number=Sing\t4\tnsubj\t4:nsubj\t_\n\
4\tdort\tdormir\tVERB\t_\tMood=Ind|Tense=Pres\t0\troot\t0:root\t_\n\
5\tsur\tsur\tADP\t_\t_\t7\tcase\t7:case\t_\n\
6\tle\tle\tDET\t_\tDefinite=Def\t7\tdet\t7:det\t_\n\
7\ttapis\ttapis\tNOUN\t_\tGender=Masc\t4\tobl\t4:obl:sur\t_\n\
8-9\tdu\t_\t_\t_\t_\t_\t_\t_\t_\n\
8\tde\tde\tADP\t_\t_\t10\tcase\t10:case\t_\n\
9\tle\tle\tDET\t_\t_\t10\tdet\t10:det\t_\n\
10\tsalon\tsalon\tNOUN\t_\t_\t7\tnmod\t7:nmod:de\tSpaceAfter=No\n\
11\t.\t.\tPUNCT\t_\t_\t4\tpunct\t4:punct\t_\n\
\n";

fn corpus_source(sentences: usize) -> String {
    SENTENCE.repeat(sentences)
}

fn read_corpus(c: &mut Criterion) {
    let source = corpus_source(500);
    c.bench_function("read_500_sentences", |b| {
        b.iter(|| parse_corpus(black_box(&source)))
    });
}

fn write_corpus_bench(c: &mut Criterion) {
    let corpus = parse_corpus(&corpus_source(500)).unwrap();
    c.bench_function("write_500_sentences", |b| {
        b.iter(|| write_corpus(black_box(&corpus)))
    });
}

fn tree_views(c: &mut Criterion) {
    let corpus = parse_corpus(SENTENCE).unwrap();
    let sentence = &corpus.sentences()[0];
    c.bench_function("projectivity_and_arc_heights", |b| {
        b.iter(|| {
            let sentence = black_box(sentence);
            (sentence.is_projective(), sentence.arc_heights())
        })
    });
}

criterion_group!(benches, read_corpus, write_corpus_bench, tree_views);
criterion_main!(benches);
