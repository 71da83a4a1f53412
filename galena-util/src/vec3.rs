use num_traits::Float;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vec3<T> {
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

macro_rules! impl_vec3_operation {
    ($trait_name:ident, $fn_name:ident, $oper:tt) => {
        impl<T: Float> std::ops::$trait_name for Vec3<T> {
            type Output = Self;
            fn $fn_name(self, rhs: Self) -> Self::Output {
                Self::new(self.x $oper rhs.x, self.y $oper rhs.y, self.z $oper rhs.z)
            }
        }
    };
}

impl_vec3_operation!(Add, add, +);
impl_vec3_operation!(Sub, sub, -);
impl_vec3_operation!(Mul, mul, *);

impl<T: Float> std::ops::Mul<T> for Vec3<T> {
    type Output = Self;
    fn mul(self, rhs: T) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl<T: Float> Vec3<T> {
    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero(), T::zero())
    }

    pub fn length(&self) -> T {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    pub fn distance(&self, other: &Self) -> T {
        (*self - *other).length()
    }
}

impl<T: Float> Default for Vec3<T> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<'de, T: Float + Deserialize<'de>> Deserialize<'de> for Vec3<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let [x, y, z] = <[T; 3]>::deserialize(deserializer)?;
        Ok(Self::new(x, y, z))
    }
}

#[cfg(test)]
mod test {
    use super::Vec3;

    #[test]
    fn distance() {
        let a = Vec3::new(0.0f64, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
