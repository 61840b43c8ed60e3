//! Kernel functions and Gram matrix construction

pub mod gamma;
pub mod gram;
pub mod kind;
pub mod laplacian;
pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::gamma::*;
pub use self::gram::*;
pub use self::kind::*;
pub use self::laplacian::*;
pub use self::linear::*;
pub use self::polynomial::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;
