use rand::Rng;

pub trait RngExt {
    fn one_chance_in(&mut self, n: usize) -> bool;
}

impl<T: Rng + ?Sized> RngExt for T {
    fn one_chance_in(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        self.gen_range(0..n) == 0
    }
}
