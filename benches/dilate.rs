use criterion::{black_box, measurement::Measurement, BenchmarkGroup, BenchmarkId, Criterion, Throughput};
use voxel_tools::{Dimension, ElementShape, GrayscaleDilate, StructuringElement, Transform, Volume};

struct BenchDef {
    volume: Volume<u16>,
    filter: GrayscaleDilate,
    id: &'static str,
    sample_size: usize,
}

impl BenchDef {
    fn new(id: &'static str, sample_size: usize, size: [usize; 3], shape: ElementShape, radius: usize) -> Self {
        let dimension = if size[2] > 1 {
            Dimension::Three
        } else {
            Dimension::Two
        };
        let mut volume = Volume::from_elem(size, dimension, 0u16);
        volume.for_each_mut(|index, value| {
            *value = ((index[0] * 31 + index[1] * 17 + index[2] * 7) % 4096) as u16;
        });
        let element = StructuringElement::new(shape, [radius; 3], dimension);
        Self {
            volume,
            filter: GrayscaleDilate::new(element),
            id,
            sample_size,
        }
    }

    fn bench_dilate<M: Measurement>(&self, group: &mut BenchmarkGroup<M>) {
        group
            .sample_size(self.sample_size)
            .throughput(Throughput::Elements(self.volume.len() as u64))
            .bench_with_input(
                BenchmarkId::new(self.id, self.filter.element.len()),
                &self.volume,
                |b, input| b.iter(|| self.filter.apply(black_box(input))),
            );
    }
}

fn main() {
    let mut c = Criterion::default().configure_from_args();
    let mut group = c.benchmark_group("dilate");
    BenchDef::new("2d-ball", 50, [512, 512, 1], ElementShape::Ball, 3).bench_dilate(&mut group);
    BenchDef::new("2d-box", 50, [512, 512, 1], ElementShape::Box, 3).bench_dilate(&mut group);
    BenchDef::new("3d-ball", 10, [128, 128, 64], ElementShape::Ball, 2).bench_dilate(&mut group);
    BenchDef::new("3d-diamond", 10, [128, 128, 64], ElementShape::Diamond, 2).bench_dilate(&mut group);
    group.finish();
}
